//! Identity: the [`AuthProvider`] capability, the built-in provider, and the
//! per-request session plumbing (middleware + route guard).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::StoreError;

pub mod guard;
pub mod jwt;
pub mod local;
pub mod mailer;
pub mod middleware;
pub mod password;

pub use local::LocalAuthProvider;
pub use middleware::{RequestContext, SessionContext, SESSION_COOKIE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: AuthUser,
    pub access_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    #[serde(skip)]
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub confirmation_sent: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("User already registered")]
    EmailTaken,

    #[error("Invalid or expired link")]
    InvalidCode,

    #[error("Failed to send email: {0}")]
    Delivery(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything the app needs from an identity provider. Handlers only talk to
/// this trait, so the provider can be swapped without touching form logic.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    /// Sends a one-time sign-in link, creating the identity if needed.
    async fn send_magic_link(&self, email: &str) -> Result<(), AuthError>;

    /// Trades a link code (sign-up confirmation or magic link) for a session.
    async fn exchange_code_for_session(&self, code: &str) -> Result<Session, AuthError>;

    /// Resolves a bearer token. Invalid, expired and revoked tokens are `None`.
    async fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError>;

    /// Like [`AuthProvider::get_session`] but also checks the identity still exists.
    async fn get_user(&self, token: &str) -> Result<Option<AuthUser>, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
