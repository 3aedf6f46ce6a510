pub mod auth;
pub mod daily_logs;
pub mod health;
pub mod pages;
pub mod product_lookup;
pub mod profile;
