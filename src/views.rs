//! View models behind the page routes. Everything here is pure: handlers
//! fetch rows, these types shape them for the client.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::config::MAX_CHALLENGE_DAYS;
use crate::models::daily_log::{DailyLog, MealCategory};
use crate::models::profile::{Gender, UserProfile};

pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 10;
pub const PROGRESS_WINDOW_DAYS: i64 = 14;
const RECENT_LOGS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeProgress {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: i64,
    pub days_elapsed: i64,
    pub percentage: i64,
}

impl ChallengeProgress {
    pub fn compute(start: NaiveDate, today: NaiveDate, total_days: i64) -> Self {
        let total = total_days.clamp(0, MAX_CHALLENGE_DAYS);
        let days_elapsed = ((today - start).num_days() + 1).clamp(0, total);
        let percentage = if total == 0 {
            0
        } else {
            (days_elapsed as f64 / total as f64 * 100.0).round() as i64
        };

        Self {
            start_date: start,
            end_date: start + Duration::days(total),
            total_days: total,
            days_elapsed,
            percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub progress: ChallengeProgress,
    pub days_logged: usize,
    pub average_sugar_grams: i64,
    pub latest_log: Option<DailyLog>,
    pub recent_logs: Vec<DailyLog>,
}

impl DashboardView {
    /// `logs` newest first, as the store returns them.
    pub fn build(
        profile: Option<&UserProfile>,
        logs: &[DailyLog],
        today: NaiveDate,
        total_days: i64,
    ) -> Self {
        let start = profile.map_or(today, |p| p.challenge_start_date);
        let average_sugar_grams = if logs.is_empty() {
            0
        } else {
            let total: f64 = logs.iter().map(|l| l.sugar_intake_grams).sum();
            (total / logs.len() as f64).round() as i64
        };

        Self {
            progress: ChallengeProgress::compute(start, today, total_days),
            days_logged: logs.len(),
            average_sugar_grams,
            latest_log: logs.first().cloned(),
            recent_logs: logs.iter().take(RECENT_LOGS).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    /// Short axis label, e.g. `Jan 5`.
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sugar: Vec<ChartPoint>,
    pub weight: Vec<ChartPoint>,
    pub mood: Vec<ChartPoint>,
    pub energy: Vec<ChartPoint>,
    pub cravings: Vec<ChartPoint>,
    pub sleep: Vec<ChartPoint>,
}

impl ProgressView {
    /// Inclusive date window the progress page covers.
    pub fn window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (today - Duration::days(PROGRESS_WINDOW_DAYS - 1), today)
    }

    pub fn build(logs: &[DailyLog], today: NaiveDate) -> Self {
        let (start_date, end_date) = Self::window(today);
        let mut in_window: Vec<&DailyLog> = logs
            .iter()
            .filter(|l| l.date >= start_date && l.date <= end_date)
            .collect();
        in_window.sort_by_key(|l| l.date);

        let series = |pick: fn(&DailyLog) -> Option<f64>| -> Vec<ChartPoint> {
            in_window
                .iter()
                .filter_map(|log| {
                    pick(log).map(|value| ChartPoint {
                        date: log.date,
                        label: log.date.format("%b %-d").to_string(),
                        value,
                    })
                })
                .collect()
        };

        Self {
            start_date,
            end_date,
            sugar: series(|l| Some(l.sugar_intake_grams)),
            weight: series(|l| l.weight_kg),
            mood: series(|l| l.mood_rating.map(f64::from)),
            energy: series(|l| l.energy_rating.map(f64::from)),
            cravings: series(|l| l.cravings_rating.map(f64::from)),
            sleep: series(|l| l.sleep_rating.map(f64::from)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodEntriesView {
    pub entries: Vec<DailyLog>,
}

impl FoodEntriesView {
    pub fn build(logs: &[DailyLog]) -> Self {
        Self {
            entries: logs
                .iter()
                .filter(|l| l.product_name.as_deref().is_some_and(|n| !n.is_empty()))
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogFormView {
    pub date: NaiveDate,
    pub existing: Option<DailyLog>,
    pub meal_categories: Vec<MealCategory>,
    pub rating_min: i32,
    pub rating_max: i32,
}

impl LogFormView {
    pub fn build(today: NaiveDate, existing: Option<DailyLog>) -> Self {
        Self {
            date: today,
            existing,
            meal_categories: MealCategory::ALL.to_vec(),
            rating_min: RATING_MIN,
            rating_max: RATING_MAX,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OnboardingView {
    pub profile: Option<UserProfile>,
    pub genders: Vec<Gender>,
    pub min_age: i32,
}

impl OnboardingView {
    pub fn build(profile: Option<UserProfile>) -> Self {
        Self {
            profile,
            genders: Gender::ALL.to_vec(),
            min_age: 18,
        }
    }
}
