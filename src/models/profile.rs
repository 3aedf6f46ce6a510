use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<i32>,
    pub weight_kg: Option<f64>,
    pub photo_url: Option<String>,
    pub challenge_start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// A fresh row as created on first sign-in, before onboarding.
    pub fn bare(id: Uuid, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email,
            gender: None,
            age: None,
            weight_kg: None,
            photo_url: None,
            challenge_start_date: now.date_naive(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_onboarded(&self) -> bool {
        self.gender.is_some() && self.age.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or(())
    }
}

/// Validated onboarding/profile edit, ready to persist.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub gender: Gender,
    pub age: i32,
    /// `None` leaves a previously stored weight untouched.
    pub weight_kg: Option<f64>,
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onboarded_requires_gender_and_age() {
        let mut profile = UserProfile::bare(Uuid::new_v4(), None, Utc::now());
        assert!(!profile.is_onboarded());

        profile.age = Some(30);
        assert!(!profile.is_onboarded());

        profile.gender = Some(Gender::Other);
        assert!(profile.is_onboarded());
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("female".parse::<Gender>(), Ok(Gender::Female));
        assert!("Female".parse::<Gender>().is_err());
        assert!("unknown".parse::<Gender>().is_err());
    }
}
