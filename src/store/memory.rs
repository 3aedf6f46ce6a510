use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::daily_log::{DailyLog, DailyLogEntry};
use crate::models::identity::{Identity, LoginCode};
use crate::models::profile::{ProfileUpdate, UserProfile};
use crate::store::{CredentialStore, RecordStore, StoreError, StoreResult};

/// In-process backend for `STORE_BACKEND=memory` and tests. Nothing survives
/// a restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    identities: HashMap<Uuid, Identity>,
    login_codes: HashMap<String, (LoginCode, bool)>,
    /// Session id -> token expiry.
    revoked_sessions: HashMap<Uuid, DateTime<Utc>>,
    profiles: HashMap<Uuid, UserProfile>,
    daily_logs: HashMap<(Uuid, NaiveDate), DailyLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn ensure_profile(&self, user_id: Uuid, email: Option<&str>) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        tables
            .profiles
            .entry(user_id)
            .or_insert_with(|| UserProfile::bare(user_id, email.map(str::to_string), Utc::now()));
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.inner.read().await.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        update: &ProfileUpdate,
        today: NaiveDate,
    ) -> StoreResult<UserProfile> {
        let now = Utc::now();
        let mut tables = self.inner.write().await;
        let profile = tables.profiles.entry(user_id).or_insert_with(|| {
            let mut fresh = UserProfile::bare(user_id, None, now);
            fresh.challenge_start_date = today;
            fresh
        });

        if !profile.is_onboarded() {
            profile.challenge_start_date = today;
        }
        if profile.email.is_none() {
            profile.email = email.map(str::to_string);
        }
        profile.gender = Some(update.gender);
        profile.age = Some(update.age);
        if update.weight_kg.is_some() {
            profile.weight_kg = update.weight_kg;
        }
        if update.photo_url.is_some() {
            profile.photo_url = update.photo_url.clone();
        }
        profile.updated_at = now;

        Ok(profile.clone())
    }

    async fn get_daily_log(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<DailyLog>> {
        Ok(self.inner.read().await.daily_logs.get(&(user_id, date)).cloned())
    }

    async fn upsert_daily_log(
        &self,
        user_id: Uuid,
        entry: &DailyLogEntry,
    ) -> StoreResult<DailyLog> {
        let now = Utc::now();
        let mut tables = self.inner.write().await;
        let key = (user_id, entry.date);

        let log = match tables.daily_logs.get(&key) {
            Some(existing) => {
                let mut updated = entry.clone().into_log(existing.id, user_id, now);
                updated.created_at = existing.created_at;
                updated
            }
            None => entry.clone().into_log(Uuid::new_v4(), user_id, now),
        };

        tables.daily_logs.insert(key, log.clone());
        Ok(log)
    }

    async fn list_daily_logs(
        &self,
        user_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> StoreResult<Vec<DailyLog>> {
        let tables = self.inner.read().await;
        let mut logs: Vec<DailyLog> = tables
            .daily_logs
            .values()
            .filter(|log| log.user_id == user_id)
            .filter(|log| start.map_or(true, |s| log.date >= s))
            .filter(|log| end.map_or(true, |e| log.date <= e))
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(logs)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_identity(
        &self,
        email: &str,
        password_hash: Option<&str>,
    ) -> StoreResult<Identity> {
        let mut tables = self.inner.write().await;
        if tables.identities.values().any(|i| i.email == email) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.map(str::to_string),
            email_confirmed_at: None,
            created_at: Utc::now(),
        };
        tables.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let tables = self.inner.read().await;
        Ok(tables.identities.values().find(|i| i.email == email).cloned())
    }

    async fn find_identity(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        Ok(self.inner.read().await.identities.get(&id).cloned())
    }

    async fn confirm_email(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(identity) = tables.identities.get_mut(&id) {
            identity.email_confirmed_at.get_or_insert(at);
        }
        Ok(())
    }

    async fn save_login_code(&self, code: &LoginCode) -> StoreResult<()> {
        let now = Utc::now();
        let mut tables = self.inner.write().await;
        tables
            .login_codes
            .retain(|_, (code, consumed)| !*consumed && code.expires_at > now);
        tables
            .login_codes
            .insert(code.code_hash.clone(), (code.clone(), false));
        Ok(())
    }

    async fn consume_login_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<LoginCode>> {
        let mut tables = self.inner.write().await;
        match tables.login_codes.get_mut(code_hash) {
            Some((code, consumed)) if !*consumed && code.expires_at > now => {
                *consumed = true;
                Ok(Some(code.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn revoke_session(
        &self,
        session_id: Uuid,
        _user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let now = Utc::now();
        let mut tables = self.inner.write().await;
        tables.revoked_sessions.retain(|_, exp| *exp > now);
        tables.revoked_sessions.insert(session_id, expires_at);
        Ok(())
    }

    async fn is_session_revoked(&self, session_id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.read().await.revoked_sessions.contains_key(&session_id))
    }
}
