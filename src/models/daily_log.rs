use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DailyLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub sugar_intake_grams: f64,
    pub weight_kg: Option<f64>,
    pub mood_rating: Option<i32>,
    pub cravings_rating: Option<i32>,
    pub energy_rating: Option<i32>,
    pub sleep_rating: Option<i32>,
    pub notes: Option<String>,
    pub product_name: Option<String>,
    pub product_barcode: Option<String>,
    pub meal_category: Option<MealCategory>,
    pub meal_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated daily log submission. Saving it for an existing date replaces
/// every metric field of that day's row.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyLogEntry {
    pub date: NaiveDate,
    pub sugar_intake_grams: f64,
    pub weight_kg: Option<f64>,
    pub mood_rating: Option<i32>,
    pub cravings_rating: Option<i32>,
    pub energy_rating: Option<i32>,
    pub sleep_rating: Option<i32>,
    pub notes: Option<String>,
    pub product_name: Option<String>,
    pub product_barcode: Option<String>,
    pub meal_category: Option<MealCategory>,
    pub meal_time: Option<NaiveTime>,
}

impl DailyLogEntry {
    pub fn into_log(self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> DailyLog {
        DailyLog {
            id,
            user_id,
            date: self.date,
            sugar_intake_grams: self.sugar_intake_grams,
            weight_kg: self.weight_kg,
            mood_rating: self.mood_rating,
            cravings_rating: self.cravings_rating,
            energy_rating: self.energy_rating,
            sleep_rating: self.sleep_rating,
            notes: self.notes,
            product_name: self.product_name,
            product_barcode: self.product_barcode,
            meal_category: self.meal_category,
            meal_time: self.meal_time,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "meal_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
    Drink,
}

impl MealCategory {
    pub const ALL: [MealCategory; 6] = [
        MealCategory::Breakfast,
        MealCategory::Lunch,
        MealCategory::Dinner,
        MealCategory::Snack,
        MealCategory::Dessert,
        MealCategory::Drink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealCategory::Breakfast => "breakfast",
            MealCategory::Lunch => "lunch",
            MealCategory::Dinner => "dinner",
            MealCategory::Snack => "snack",
            MealCategory::Dessert => "dessert",
            MealCategory::Drink => "drink",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MealCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DailyLogQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
