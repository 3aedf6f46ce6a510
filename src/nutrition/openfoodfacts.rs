use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::Config;
use crate::nutrition::{
    nova_group_description, per_serving, LookupError, Nutrition, NutritionLookup, ProductInfo,
};

const DEFAULT_SERVING: f64 = 100.0;

#[derive(Clone)]
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Self::new(
            &config.off_base_url,
            &config.off_user_agent,
            Duration::from_secs(config.off_timeout_secs),
        )
    }
}

#[async_trait]
impl NutritionLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> Result<ProductInfo, LookupError> {
        let url = format!("{}/api/v2/product/{}.json", self.base_url, barcode);
        tracing::debug!(barcode = %barcode, "Looking up product");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        if !status.is_success() {
            return Err(LookupError::Network(format!("OpenFoodFacts returned {}", status)));
        }

        let body: OffResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))?;

        if body.status == Some(0) {
            return Err(LookupError::NotFound);
        }
        let product = body.product.ok_or(LookupError::NotFound)?;

        Ok(product.into_product_info(barcode))
    }
}

#[derive(Debug, Deserialize)]
struct OffResponse {
    #[serde(default, deserialize_with = "lenient_i64")]
    status: Option<i64>,
    product: Option<OffProduct>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OffProduct {
    product_name: Option<String>,
    brands: Option<String>,
    image_url: Option<String>,
    nutriments: OffNutriments,
    #[serde(deserialize_with = "lenient_f64")]
    serving_quantity: Option<f64>,
    serving_quantity_unit: Option<String>,
    ingredients_text: Option<String>,
    nutrition_grades: Option<String>,
    nutrition_grade_fr: Option<String>,
    ecoscore_grade: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    nova_group: Option<i64>,
    allergens_tags: Vec<String>,
    additives_tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OffNutriments {
    #[serde(deserialize_with = "lenient_f64")]
    sugars_100g: Option<f64>,
    #[serde(rename = "energy-kcal_100g", deserialize_with = "lenient_f64")]
    energy_kcal_100g: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    fat_100g: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    proteins_100g: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    carbohydrates_100g: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    sodium_100g: Option<f64>,
}

impl OffProduct {
    /// Serving quantity when it is positive and in grams or millilitres;
    /// otherwise the per-100g basis.
    fn serving_size(&self) -> f64 {
        let unit_ok = match self.serving_quantity_unit.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(unit) => unit.eq_ignore_ascii_case("g") || unit.eq_ignore_ascii_case("ml"),
        };
        match self.serving_quantity {
            Some(q) if q > 0.0 && unit_ok => q,
            _ => DEFAULT_SERVING,
        }
    }

    fn into_product_info(self, barcode: &str) -> ProductInfo {
        let serving = self.serving_size();
        let n = &self.nutriments;
        let sugar = n.sugars_100g.unwrap_or(0.0);
        let calories = n.energy_kcal_100g.unwrap_or(0.0);

        let nutrition = Nutrition {
            sugar_per_100g: sugar,
            sugar_per_serving: per_serving(sugar, serving),
            calories_per_100g: calories,
            calories_per_serving: per_serving(calories, serving),
            fat_per_100g: n.fat_100g.unwrap_or(0.0),
            protein_per_100g: n.proteins_100g.unwrap_or(0.0),
            carbs_per_100g: n.carbohydrates_100g.unwrap_or(0.0),
            sodium_per_100g: n.sodium_100g,
        };

        let nova_group = self
            .nova_group
            .and_then(|g| u8::try_from(g).ok())
            .unwrap_or(0);

        ProductInfo {
            name: non_empty(self.product_name).unwrap_or_else(|| "Unknown Product".into()),
            brand: self.brands.unwrap_or_default(),
            barcode: barcode.to_string(),
            image_url: non_empty(self.image_url),
            nutrition,
            serving_size: serving,
            ingredients: split_ingredients(self.ingredients_text.as_deref()),
            allergens: strip_tags(self.allergens_tags),
            additives: strip_tags(self.additives_tags),
            nutrition_grade: self
                .nutrition_grades
                .or(self.nutrition_grade_fr)
                .unwrap_or_default(),
            eco_score: self.ecoscore_grade.unwrap_or_default(),
            nova_group,
            processing_level: nova_group_description(nova_group),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Splits on commas outside any `()` or `[]` group, so sub-ingredient
/// lists stay attached to their parent.
fn split_ingredients(text: Option<&str>) -> Vec<String> {
    let text = text.unwrap_or_default();
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&text[start..]);

    let items: Vec<String> = items
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        vec!["No ingredients listed".to_string()]
    } else {
        items
    }
}

/// `en:milk` → `milk`. Tags without a language prefix pass through.
fn strip_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| match tag.split_once(':') {
            Some((_, rest)) => rest.to_string(),
            None => tag,
        })
        .collect()
}

// OpenFoodFacts returns numbers as JSON numbers or strings depending on the
// product; anything unparseable is treated as absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    fn product(value: Value) -> OffProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_serving_scaling_from_quantity() {
        let info = product(json!({
            "product_name": "Cola",
            "nutriments": { "sugars_100g": 10, "energy-kcal_100g": 42 },
            "serving_quantity": 30
        }))
        .into_product_info("5000112546415");

        assert_eq!(info.serving_size, 30.0);
        assert_eq!(info.nutrition.sugar_per_serving, 3.0);
        assert_eq!(info.nutrition.calories_per_serving, 12.6);
        assert_eq!(info.barcode, "5000112546415");
    }

    #[test]
    fn test_string_quantity_and_unknown_unit() {
        let info = product(json!({
            "nutriments": { "sugars_100g": "5.5" },
            "serving_quantity": "250",
            "serving_quantity_unit": "ml"
        }))
        .into_product_info("1");
        assert_eq!(info.serving_size, 250.0);
        assert_eq!(info.nutrition.sugar_per_100g, 5.5);

        let info = product(json!({
            "serving_quantity": 2,
            "serving_quantity_unit": "piece"
        }))
        .into_product_info("1");
        assert_eq!(info.serving_size, 100.0);
    }

    #[test]
    fn test_defaults_for_sparse_product() {
        let info = product(json!({})).into_product_info("42");
        assert_eq!(info.name, "Unknown Product");
        assert_eq!(info.brand, "");
        assert_eq!(info.ingredients, vec!["No ingredients listed"]);
        assert_eq!(info.nova_group, 0);
        assert_eq!(info.processing_level, "Unknown processing level");
        assert_eq!(info.nutrition.sodium_per_100g, None);
        assert_eq!(info.serving_size, 100.0);
    }

    #[test]
    fn test_tags_and_ingredients() {
        let info = product(json!({
            "ingredients_text": "sugar, cocoa butter,  milk ,",
            "allergens_tags": ["en:milk", "fr:soja"],
            "additives_tags": ["en:e322"],
            "nova_group": 4
        }))
        .into_product_info("1");

        assert_eq!(info.ingredients, vec!["sugar", "cocoa butter", "milk"]);
        assert_eq!(info.allergens, vec!["milk", "soja"]);
        assert_eq!(info.additives, vec!["e322"]);
        assert_eq!(info.processing_level, "Ultra-processed foods");
    }

    #[test]
    fn test_nested_ingredient_lists_stay_whole() {
        let items = split_ingredients(Some(
            "sugar, emulsifier (soy lecithin, E476), cocoa, flavour [vanilla, (natural)]",
        ));
        assert_eq!(
            items,
            vec![
                "sugar",
                "emulsifier (soy lecithin, E476)",
                "cocoa",
                "flavour [vanilla, (natural)]",
            ]
        );
    }

    async fn spawn_upstream() -> String {
        let app = Router::new().route(
            "/api/v2/product/:file",
            get(|Path(file): Path<String>| async move {
                match file.as_str() {
                    "5000112546415.json" => (
                        StatusCode::OK,
                        Json(json!({
                            "status": 1,
                            "product": {
                                "product_name": "Test Bar",
                                "nutriments": { "sugars_100g": 10 },
                                "serving_quantity": "30"
                            }
                        })),
                    ),
                    "111.json" => (
                        StatusCode::OK,
                        Json(json!({ "status": 0, "status_verbose": "product not found" })),
                    ),
                    _ => (StatusCode::NOT_FOUND, Json(json!({ "status": 0 }))),
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_client_against_local_upstream() {
        let base = spawn_upstream().await;
        let client = OpenFoodFactsClient::new(&base, "nosugar-tests", Duration::from_secs(5)).unwrap();

        let info = client.lookup("5000112546415").await.unwrap();
        assert_eq!(info.name, "Test Bar");
        assert_eq!(info.nutrition.sugar_per_serving, 3.0);

        assert!(matches!(client.lookup("111").await, Err(LookupError::NotFound)));
        assert!(matches!(client.lookup("222").await, Err(LookupError::NotFound)));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_error() {
        let client =
            OpenFoodFactsClient::new("http://127.0.0.1:1", "nosugar-tests", Duration::from_secs(2))
                .unwrap();
        assert!(matches!(client.lookup("1").await, Err(LookupError::Network(_))));
    }
}
