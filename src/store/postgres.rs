use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::daily_log::{DailyLog, DailyLogEntry};
use crate::models::identity::{Identity, LoginCode};
use crate::models::profile::{ProfileUpdate, UserProfile};
use crate::store::{CredentialStore, RecordStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }

    async fn ensure_profile(&self, user_id: Uuid, email: Option<&str>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(email)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(profile)
    }

    async fn upsert_profile(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        update: &ProfileUpdate,
        today: NaiveDate,
    ) -> StoreResult<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (id, email, gender, age, weight_kg, photo_url, challenge_start_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                email = COALESCE(user_profiles.email, EXCLUDED.email),
                gender = EXCLUDED.gender,
                age = EXCLUDED.age,
                weight_kg = COALESCE(EXCLUDED.weight_kg, user_profiles.weight_kg),
                photo_url = COALESCE(EXCLUDED.photo_url, user_profiles.photo_url),
                challenge_start_date = CASE
                    WHEN user_profiles.gender IS NULL OR user_profiles.age IS NULL
                        THEN EXCLUDED.challenge_start_date
                    ELSE user_profiles.challenge_start_date
                END,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(update.gender)
        .bind(update.age)
        .bind(update.weight_kg)
        .bind(&update.photo_url)
        .bind(today)
        .fetch_one(&self.db)
        .await?;
        Ok(profile)
    }

    async fn get_daily_log(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<DailyLog>> {
        let log = sqlx::query_as::<_, DailyLog>(
            "SELECT * FROM daily_logs WHERE user_id = $1 AND date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;
        Ok(log)
    }

    async fn upsert_daily_log(
        &self,
        user_id: Uuid,
        entry: &DailyLogEntry,
    ) -> StoreResult<DailyLog> {
        let log = sqlx::query_as::<_, DailyLog>(
            r#"
            INSERT INTO daily_logs (
                id, user_id, date, sugar_intake_grams, weight_kg,
                mood_rating, cravings_rating, energy_rating, sleep_rating, notes,
                product_name, product_barcode, meal_category, meal_time
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (user_id, date) DO UPDATE SET
                sugar_intake_grams = EXCLUDED.sugar_intake_grams,
                weight_kg = EXCLUDED.weight_kg,
                mood_rating = EXCLUDED.mood_rating,
                cravings_rating = EXCLUDED.cravings_rating,
                energy_rating = EXCLUDED.energy_rating,
                sleep_rating = EXCLUDED.sleep_rating,
                notes = EXCLUDED.notes,
                product_name = EXCLUDED.product_name,
                product_barcode = EXCLUDED.product_barcode,
                meal_category = EXCLUDED.meal_category,
                meal_time = EXCLUDED.meal_time,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(entry.date)
        .bind(entry.sugar_intake_grams)
        .bind(entry.weight_kg)
        .bind(entry.mood_rating)
        .bind(entry.cravings_rating)
        .bind(entry.energy_rating)
        .bind(entry.sleep_rating)
        .bind(&entry.notes)
        .bind(&entry.product_name)
        .bind(&entry.product_barcode)
        .bind(entry.meal_category)
        .bind(entry.meal_time)
        .fetch_one(&self.db)
        .await?;
        Ok(log)
    }

    async fn list_daily_logs(
        &self,
        user_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> StoreResult<Vec<DailyLog>> {
        let logs = sqlx::query_as::<_, DailyLog>(
            r#"
            SELECT * FROM daily_logs
            WHERE user_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;
        Ok(logs)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_identity(
        &self,
        email: &str,
        password_hash: Option<&str>,
    ) -> StoreResult<Identity> {
        sqlx::query_as::<_, Identity>(
            r#"
            INSERT INTO auth_users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict("Email already registered".into())
            }
            other => StoreError::Database(other),
        })
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>("SELECT * FROM auth_users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(identity)
    }

    async fn find_identity(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>("SELECT * FROM auth_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(identity)
    }

    async fn confirm_email(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_users
            SET email_confirmed_at = COALESCE(email_confirmed_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn save_login_code(&self, code: &LoginCode) -> StoreResult<()> {
        sqlx::query(
            "DELETE FROM auth_login_codes WHERE consumed_at IS NOT NULL OR expires_at < NOW()",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO auth_login_codes (code_hash, user_id, purpose, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&code.code_hash)
        .bind(code.user_id)
        .bind(code.purpose)
        .bind(code.expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn consume_login_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<LoginCode>> {
        let code = sqlx::query_as::<_, LoginCode>(
            r#"
            UPDATE auth_login_codes
            SET consumed_at = $2
            WHERE code_hash = $1 AND consumed_at IS NULL AND expires_at > $2
            RETURNING code_hash, user_id, purpose, expires_at
            "#,
        )
        .bind(code_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(code)
    }

    async fn revoke_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM revoked_sessions WHERE expires_at < NOW()")
            .execute(&self.db)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO revoked_sessions (session_id, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn is_session_revoked(&self, session_id: Uuid) -> StoreResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM revoked_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count > 0)
    }
}
