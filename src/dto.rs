//! # No Sugar Challenge: Request/Response DTOs
//!
//! Every form the client submits lands in one of the `*Form` structs below.
//!
//! Conventions:
//! - `*Form`     → deserialized from client JSON body
//! - `*Response` → serialized to client JSON
//! - Field rules are expressed via `validator` derive macros and reported
//!   back as a field-keyed map (see [`field_errors`])
//! - Blank strings from optional inputs are treated as absent

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::{AuthUser, Session};
use crate::error::FieldErrors;
use crate::models::daily_log::{DailyLog, DailyLogEntry, MealCategory};
use crate::models::profile::{Gender, ProfileUpdate, UserProfile};

// ============================================================================
// Common
// ============================================================================

/// Standard success message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Flatten `validator` output into `{ field: [message, ...] }`.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Numeric form inputs arrive as numbers, numeric strings, blanks or `null`.
/// Blanks and `null` are absent.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom("Must be a number")),
        Some(n @ Value::Number(_)) => T::deserialize(n)
            .map(Some)
            .map_err(|_| D::Error::custom("Must be a number")),
        Some(_) => Err(D::Error::custom("Must be a number")),
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub(crate) fn parse_meal_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    parse_iso_date(value)
        .map(|_| ())
        .ok_or_else(|| invalid("date", "Date must be in YYYY-MM-DD format"))
}

fn validate_meal_time(value: &str) -> Result<(), ValidationError> {
    parse_meal_time(value)
        .map(|_| ())
        .ok_or_else(|| invalid("meal_time", "Time must be in HH:MM format"))
}

fn validate_meal_category(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<MealCategory>()
        .map(|_| ())
        .map_err(|_| invalid("meal_category", "Unknown meal category"))
}

fn validate_gender(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Gender>()
        .map(|_| ())
        .map_err(|_| invalid("gender", "Gender must be male, female or other"))
}

pub(crate) fn validate_barcode(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.len() > 32 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("barcode", "Barcode must contain only digits"));
    }
    Ok(())
}

fn validate_photo_url(value: &str) -> Result<(), ValidationError> {
    if value.starts_with("https://") || value.starts_with("http://") || value.starts_with('/') {
        Ok(())
    } else {
        Err(invalid("photo_url", "Photo URL must be absolute"))
    }
}

// ============================================================================
// Auth
// ============================================================================

/// POST /api/auth/sign-up
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// POST /api/auth/sign-in
#[derive(Debug, Deserialize, Validate)]
pub struct SignInForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Please enter your password"))]
    pub password: String,
}

/// POST /api/auth/magic-link
#[derive(Debug, Deserialize, Validate)]
pub struct MagicLinkForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(
        required(message = "Email is required"),
        email(message = "Please enter a valid email address")
    )]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub success: bool,
    pub user: AuthUser,
    pub access_token: String,
    pub expires_at: i64,
}

impl From<&Session> for SignInResponse {
    fn from(session: &Session) -> Self {
        Self {
            success: true,
            user: session.user.clone(),
            access_token: session.access_token.clone(),
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Option<Session>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

// ============================================================================
// Profile
// ============================================================================

/// POST /api/profile, used by onboarding and later profile edits
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(
        required(message = "Gender is required"),
        custom(function = "validate_gender")
    )]
    pub gender: Option<String>,

    #[serde(default, deserialize_with = "lenient_number")]
    #[validate(
        required(message = "Age is required"),
        range(min = 18, message = "You must be at least 18 years old")
    )]
    pub age: Option<i32>,

    #[serde(default, deserialize_with = "lenient_number")]
    #[validate(range(min = 0.0, message = "Weight cannot be negative"))]
    pub weight: Option<f64>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(
        length(max = 2048, message = "Photo URL is too long"),
        custom(function = "validate_photo_url")
    )]
    pub photo_url: Option<String>,
}

impl ProfileForm {
    pub fn validated(self) -> Result<ProfileUpdate, FieldErrors> {
        self.validate().map_err(|e| field_errors(&e))?;

        let gender = self
            .gender
            .as_deref()
            .and_then(|g| g.parse::<Gender>().ok())
            .ok_or_else(|| single("gender", "Gender is required"))?;
        let age = self.age.ok_or_else(|| single("age", "Age is required"))?;

        Ok(ProfileUpdate {
            gender,
            age,
            weight_kg: self.weight,
            photo_url: self.photo_url,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct ProfileSavedResponse {
    pub success: bool,
    pub message: String,
    pub profile: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct PhotoUploadResponse {
    pub success: bool,
    pub url: String,
}

// ============================================================================
// Daily logs
// ============================================================================

/// POST /api/daily-logs
#[derive(Debug, Deserialize, Validate)]
pub struct DailyLogForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(
        required(message = "Date is required"),
        custom(function = "validate_iso_date")
    )]
    pub date: Option<String>,

    /// Missing intake counts as zero grams.
    #[serde(default, deserialize_with = "lenient_number")]
    #[validate(range(min = 0.0, message = "Sugar intake cannot be negative"))]
    pub sugar_intake_grams: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    #[validate(range(min = 20.0, message = "Weight must be at least 20kg"))]
    pub weight_kg: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    #[validate(range(min = 1, max = 10, message = "Rating must be between 1-10"))]
    pub mood_rating: Option<i32>,

    #[serde(default, deserialize_with = "lenient_number")]
    #[validate(range(min = 1, max = 10, message = "Rating must be between 1-10"))]
    pub cravings_rating: Option<i32>,

    #[serde(default, deserialize_with = "lenient_number")]
    #[validate(range(min = 1, max = 10, message = "Rating must be between 1-10"))]
    pub energy_rating: Option<i32>,

    #[serde(default, deserialize_with = "lenient_number")]
    #[validate(range(min = 1, max = 10, message = "Rating must be between 1-10"))]
    pub sleep_rating: Option<i32>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 5000, message = "Notes must be under 5000 characters"))]
    pub notes: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 200, message = "Product name must be under 200 characters"))]
    pub product_name: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_barcode"))]
    pub product_barcode: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_meal_category"))]
    pub meal_category: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_meal_time"))]
    pub meal_time: Option<String>,
}

impl DailyLogForm {
    pub fn validated(self) -> Result<DailyLogEntry, FieldErrors> {
        self.validate().map_err(|e| field_errors(&e))?;

        let date = self
            .date
            .as_deref()
            .and_then(parse_iso_date)
            .ok_or_else(|| single("date", "Date is required"))?;

        Ok(DailyLogEntry {
            date,
            sugar_intake_grams: self.sugar_intake_grams.unwrap_or(0.0),
            weight_kg: self.weight_kg,
            mood_rating: self.mood_rating,
            cravings_rating: self.cravings_rating,
            energy_rating: self.energy_rating,
            sleep_rating: self.sleep_rating,
            notes: self.notes,
            product_name: self.product_name,
            product_barcode: self.product_barcode,
            meal_category: self.meal_category.as_deref().and_then(|c| c.parse().ok()),
            meal_time: self.meal_time.as_deref().and_then(parse_meal_time),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DailyLogSavedResponse {
    pub success: bool,
    pub message: String,
    pub log: DailyLog,
}

// ============================================================================
// Product lookup
// ============================================================================

/// GET /api/product-lookup?barcode=
#[derive(Debug, Deserialize)]
pub struct ProductLookupQuery {
    pub barcode: Option<String>,
}

fn single(field: &str, message: &str) -> FieldErrors {
    let mut fields = FieldErrors::new();
    fields.insert(field.to_string(), vec![message.to_string()]);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log_form(value: serde_json::Value) -> DailyLogForm {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_ratings_outside_range_rejected() {
        for bad in [0, 11, -3, 100] {
            for field in ["mood_rating", "cravings_rating", "energy_rating", "sleep_rating"] {
                let form = log_form(json!({ "date": "2024-01-01", field: bad }));
                let errors = form.validated().unwrap_err();
                assert_eq!(
                    errors.get(field).map(|m| m[0].as_str()),
                    Some("Rating must be between 1-10"),
                    "{} = {} should be rejected",
                    field,
                    bad
                );
            }
        }
    }

    #[test]
    fn test_ratings_within_range_accepted() {
        let form = log_form(json!({
            "date": "2024-01-01",
            "mood_rating": 1,
            "cravings_rating": 10,
            "energy_rating": 5,
            "sleep_rating": 7,
        }));
        let entry = form.validated().unwrap();
        assert_eq!(entry.mood_rating, Some(1));
        assert_eq!(entry.cravings_rating, Some(10));
    }

    #[test]
    fn test_negative_sugar_rejected() {
        let form = log_form(json!({ "date": "2024-01-01", "sugar_intake_grams": -0.5 }));
        let errors = form.validated().unwrap_err();
        assert_eq!(
            errors["sugar_intake_grams"],
            vec!["Sugar intake cannot be negative".to_string()]
        );
    }

    #[test]
    fn test_missing_sugar_defaults_to_zero() {
        let entry = log_form(json!({ "date": "2024-01-01" })).validated().unwrap();
        assert_eq!(entry.sugar_intake_grams, 0.0);
    }

    #[test]
    fn test_numbers_sent_as_text_are_coerced() {
        let entry = log_form(json!({
            "date": "2024-01-01",
            "sugar_intake_grams": "12.5",
            "mood_rating": "5",
            "sleep_rating": " 8 ",
            "weight_kg": "",
            "energy_rating": null,
        }))
        .validated()
        .unwrap();

        assert_eq!(entry.sugar_intake_grams, 12.5);
        assert_eq!(entry.mood_rating, Some(5));
        assert_eq!(entry.sleep_rating, Some(8));
        assert_eq!(entry.weight_kg, None);
        assert_eq!(entry.energy_rating, None);

        let entry = log_form(json!({ "date": "2024-01-01", "sugar_intake_grams": null }))
            .validated()
            .unwrap();
        assert_eq!(entry.sugar_intake_grams, 0.0);

        let errors = log_form(json!({ "date": "2024-01-01", "cravings_rating": "11" }))
            .validated()
            .unwrap_err();
        assert_eq!(errors["cravings_rating"], vec!["Rating must be between 1-10".to_string()]);
    }

    #[test]
    fn test_non_numeric_text_fails_to_parse() {
        let err = serde_json::from_value::<DailyLogForm>(
            json!({ "date": "2024-01-01", "mood_rating": "great" }),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Must be a number"));

        let profile: ProfileForm =
            serde_json::from_value(json!({ "gender": "male", "age": "41", "weight": "80.2" }))
                .unwrap();
        assert_eq!(profile.age, Some(41));
        assert_eq!(profile.weight, Some(80.2));
    }

    #[test]
    fn test_date_required_and_parsed() {
        let errors = log_form(json!({ "sugar_intake_grams": 4 })).validated().unwrap_err();
        assert_eq!(errors["date"], vec!["Date is required".to_string()]);

        let errors = log_form(json!({ "date": "   " })).validated().unwrap_err();
        assert!(errors.contains_key("date"));

        let errors = log_form(json!({ "date": "01/02/2024" })).validated().unwrap_err();
        assert_eq!(errors["date"], vec!["Date must be in YYYY-MM-DD format".to_string()]);
    }

    #[test]
    fn test_light_weight_rejected() {
        let errors = log_form(json!({ "date": "2024-01-01", "weight_kg": 12.0 }))
            .validated()
            .unwrap_err();
        assert!(errors.contains_key("weight_kg"));
    }

    #[test]
    fn test_meal_fields_parsed() {
        let entry = log_form(json!({
            "date": "2024-01-01",
            "product_name": "Cola",
            "product_barcode": "5000112546415",
            "meal_category": "drink",
            "meal_time": "14:30",
            "notes": "",
        }))
        .validated()
        .unwrap();

        assert_eq!(entry.meal_category, Some(MealCategory::Drink));
        assert_eq!(entry.meal_time, NaiveTime::from_hms_opt(14, 30, 0));
        assert_eq!(entry.notes, None);
    }

    #[test]
    fn test_bad_meal_fields_rejected() {
        let errors = log_form(json!({
            "date": "2024-01-01",
            "product_barcode": "50001-12",
            "meal_category": "brunch",
            "meal_time": "25:99",
        }))
        .validated()
        .unwrap_err();

        assert!(errors.contains_key("product_barcode"));
        assert!(errors.contains_key("meal_category"));
        assert!(errors.contains_key("meal_time"));
    }

    #[test]
    fn test_sign_up_short_password() {
        let form = SignUpForm {
            email: "someone@example.com".into(),
            password: "short".into(),
        };
        let errors = field_errors(&form.validate().unwrap_err());
        assert_eq!(
            errors["password"],
            vec!["Password must be at least 8 characters".to_string()]
        );
        assert!(!errors.contains_key("email"));
    }

    #[test]
    fn test_sign_in_requires_password() {
        let form = SignInForm {
            email: "not-an-email".into(),
            password: String::new(),
        };
        let errors = field_errors(&form.validate().unwrap_err());
        assert!(errors.contains_key("email"));
        assert_eq!(errors["password"], vec!["Please enter your password".to_string()]);
    }

    #[test]
    fn test_profile_form_rules() {
        let form: ProfileForm =
            serde_json::from_value(json!({ "gender": "robot", "age": 16, "weight": -1.0 }))
                .unwrap();
        let errors = form.validated().unwrap_err();
        assert!(errors.contains_key("gender"));
        assert_eq!(errors["age"], vec!["You must be at least 18 years old".to_string()]);
        assert!(errors.contains_key("weight"));

        let form: ProfileForm = serde_json::from_value(json!({
            "gender": "female",
            "age": 34,
            "photo_url": "/uploads/abc.png",
        }))
        .unwrap();
        let update = form.validated().unwrap();
        assert_eq!(update.gender, Gender::Female);
        assert_eq!(update.weight_kg, None);
    }
}
