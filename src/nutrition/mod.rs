//! Barcode → product nutrition, behind the [`NutritionLookup`] capability.
//! Every lookup goes to the upstream API; nothing is cached or retried.

use async_trait::async_trait;
use serde::Serialize;

pub mod openfoodfacts;

pub use openfoodfacts::OpenFoodFactsClient;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nutrition {
    pub sugar_per_100g: f64,
    pub sugar_per_serving: f64,
    pub calories_per_100g: f64,
    pub calories_per_serving: f64,
    pub fat_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub sodium_per_100g: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductInfo {
    pub name: String,
    pub brand: String,
    pub barcode: String,
    pub image_url: Option<String>,
    pub nutrition: Nutrition,
    /// Grams (or millilitres) the per-serving values refer to.
    pub serving_size: f64,
    pub ingredients: Vec<String>,
    pub allergens: Vec<String>,
    pub additives: Vec<String>,
    pub nutrition_grade: String,
    pub eco_score: String,
    pub nova_group: u8,
    pub processing_level: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Product not found")]
    NotFound,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait NutritionLookup: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<ProductInfo, LookupError>;
}

pub fn nova_group_description(group: u8) -> &'static str {
    match group {
        1 => "Unprocessed or minimally processed foods",
        2 => "Processed culinary ingredients",
        3 => "Processed foods",
        4 => "Ultra-processed foods",
        _ => "Unknown processing level",
    }
}

/// Scales a per-100g value to `serving` grams.
pub fn per_serving(per_100g: f64, serving: f64) -> f64 {
    per_100g * serving / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_serving_scaling() {
        assert_eq!(per_serving(10.0, 30.0), 3.0);
        assert_eq!(per_serving(10.0, 100.0), 10.0);
        assert_eq!(per_serving(0.0, 250.0), 0.0);
    }

    #[test]
    fn test_nova_descriptions() {
        assert_eq!(nova_group_description(4), "Ultra-processed foods");
        assert_eq!(nova_group_description(0), "Unknown processing level");
        assert_eq!(nova_group_description(9), "Unknown processing level");
    }
}
