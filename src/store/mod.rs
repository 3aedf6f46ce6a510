//! Persistence capabilities. [`RecordStore`] holds the app's own rows
//! (profiles, daily logs); [`CredentialStore`] backs the built-in identity
//! provider. Both are implemented by [`PgStore`] and [`MemoryStore`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::daily_log::{DailyLog, DailyLogEntry};
use crate::models::identity::{Identity, LoginCode};
use crate::models::profile::{ProfileUpdate, UserProfile};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Profile and daily-log rows. Every method is keyed by the owner id; callers
/// pass the session identity, never a client-supplied id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    /// Creates a bare profile row for a new identity; no-op when one exists.
    async fn ensure_profile(&self, user_id: Uuid, email: Option<&str>) -> StoreResult<()>;

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>>;

    /// Inserts or updates the profile. The challenge starts on `today` the
    /// first time the profile becomes onboarded.
    async fn upsert_profile(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        update: &ProfileUpdate,
        today: NaiveDate,
    ) -> StoreResult<UserProfile>;

    async fn get_daily_log(&self, user_id: Uuid, date: NaiveDate)
        -> StoreResult<Option<DailyLog>>;

    /// One row per `(user_id, date)`: a second save for the same day replaces
    /// the metric fields of the existing row.
    async fn upsert_daily_log(&self, user_id: Uuid, entry: &DailyLogEntry)
        -> StoreResult<DailyLog>;

    /// Newest first; both bounds inclusive and optional.
    async fn list_daily_logs(
        &self,
        user_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> StoreResult<Vec<DailyLog>>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create_identity(
        &self,
        email: &str,
        password_hash: Option<&str>,
    ) -> StoreResult<Identity>;

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    async fn find_identity(&self, id: Uuid) -> StoreResult<Option<Identity>>;

    async fn confirm_email(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    async fn save_login_code(&self, code: &LoginCode) -> StoreResult<()>;

    /// Marks the code used and returns it, if it exists, is unused and has
    /// not expired at `now`.
    async fn consume_login_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<LoginCode>>;

    async fn revoke_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn is_session_revoked(&self, session_id: Uuid) -> StoreResult<bool>;
}
