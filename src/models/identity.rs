use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Credentials of the built-in identity provider. Never serialized to clients.
#[derive(Debug, Clone, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    /// `None` for passwordless (magic link only) accounts.
    pub password_hash: Option<String>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "login_code_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoginCodePurpose {
    Signup,
    MagicLink,
}

/// One-time code behind a confirmation or magic link. Only the hash is stored.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct LoginCode {
    pub code_hash: String,
    pub user_id: Uuid,
    pub purpose: LoginCodePurpose,
    pub expires_at: DateTime<Utc>,
}
