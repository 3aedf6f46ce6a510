pub mod daily_log;
pub mod identity;
pub mod profile;
