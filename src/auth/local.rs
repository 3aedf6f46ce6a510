use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::auth::jwt::{create_session_token, generate_login_code, hash_token, verify_token};
use crate::auth::mailer::LinkMailer;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{normalize_email, AuthError, AuthProvider, AuthUser, Session, SignUpOutcome};
use crate::config::Config;
use crate::models::identity::{Identity, LoginCode, LoginCodePurpose};
use crate::store::{CredentialStore, StoreError};

/// Email/password and magic-link identity provider backed by a
/// [`CredentialStore`]. Sessions are signed JWTs; sign-out records the
/// session id as revoked.
#[derive(Clone)]
pub struct LocalAuthProvider {
    credentials: Arc<dyn CredentialStore>,
    mailer: Arc<dyn LinkMailer>,
    config: Arc<Config>,
}

impl LocalAuthProvider {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        mailer: Arc<dyn LinkMailer>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            credentials,
            mailer,
            config,
        }
    }

    fn issue_session(&self, identity: &Identity) -> Result<Session, AuthError> {
        let (token, claims) = create_session_token(identity.id, &identity.email, &self.config)?;
        Ok(Session {
            user: AuthUser {
                id: identity.id,
                email: Some(identity.email.clone()),
            },
            access_token: token,
            expires_at: claims.exp,
            session_id: claims.jti,
        })
    }

    async fn send_code(
        &self,
        identity: &Identity,
        purpose: LoginCodePurpose,
    ) -> Result<(), AuthError> {
        let raw = generate_login_code();
        let code = LoginCode {
            code_hash: hash_token(&raw),
            user_id: identity.id,
            purpose,
            expires_at: Utc::now() + Duration::seconds(self.config.login_code_ttl_secs),
        };
        self.credentials.save_login_code(&code).await?;

        let link = format!("{}?code={}", self.config.auth_callback_url(), raw);
        self.mailer.send_link(&identity.email, purpose, &link).await
    }
}

/// Hash verified when the email is unknown or passwordless, so every
/// password sign-in pays for one argon2 verification.
fn dummy_password_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("nosugar-unused-password").ok())
        .as_deref()
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let email = normalize_email(email);
        let pwd_hash = hash_password(password)?;

        let identity = self
            .credentials
            .create_identity(&email, Some(&pwd_hash))
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Store(other),
            })?;

        self.send_code(&identity, LoginCodePurpose::Signup).await?;
        tracing::info!(user_id = %identity.id, "Identity created");

        Ok(SignUpOutcome {
            user: AuthUser {
                id: identity.id,
                email: Some(identity.email),
            },
            confirmation_sent: true,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let identity = self
            .credentials
            .find_identity_by_email(&normalize_email(email))
            .await?;

        let Some((identity, hash)) = identity
            .as_ref()
            .and_then(|i| i.password_hash.as_deref().map(|hash| (i, hash)))
        else {
            if let Some(dummy) = dummy_password_hash() {
                let _ = verify_password(password, dummy);
            }
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if identity.email_confirmed_at.is_none() {
            return Err(AuthError::EmailNotConfirmed);
        }

        self.issue_session(identity)
    }

    async fn send_magic_link(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let identity = match self.credentials.find_identity_by_email(&email).await? {
            Some(identity) => identity,
            None => self.credentials.create_identity(&email, None).await?,
        };

        self.send_code(&identity, LoginCodePurpose::MagicLink).await
    }

    async fn exchange_code_for_session(&self, code: &str) -> Result<Session, AuthError> {
        let now: DateTime<Utc> = Utc::now();
        let login_code = self
            .credentials
            .consume_login_code(&hash_token(code), now)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        self.credentials.confirm_email(login_code.user_id, now).await?;
        let identity = self
            .credentials
            .find_identity(login_code.user_id)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        self.issue_session(&identity)
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let Some(claims) = verify_token(token, &self.config) else {
            return Ok(None);
        };

        if self.credentials.is_session_revoked(claims.jti).await? {
            return Ok(None);
        }

        Ok(Some(Session {
            user: AuthUser {
                id: claims.sub,
                email: if claims.email.is_empty() {
                    None
                } else {
                    Some(claims.email)
                },
            },
            access_token: token.to_string(),
            expires_at: claims.exp,
            session_id: claims.jti,
        }))
    }

    async fn get_user(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        let Some(session) = self.get_session(token).await? else {
            return Ok(None);
        };

        Ok(self
            .credentials
            .find_identity(session.user.id)
            .await?
            .map(|identity| AuthUser {
                id: identity.id,
                email: Some(identity.email),
            }))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let expires_at =
            DateTime::<Utc>::from_timestamp(session.expires_at, 0).unwrap_or_else(Utc::now);
        self.credentials
            .revoke_session(session.session_id, session.user.id, expires_at)
            .await?;
        tracing::info!(user_id = %session.user.id, "Session revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::{test_config, RecordingMailer};

    fn provider() -> (LocalAuthProvider, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::default());
        let provider = LocalAuthProvider::new(
            Arc::new(MemoryStore::new()),
            mailer.clone(),
            Arc::new(test_config()),
        );
        (provider, mailer)
    }

    async fn confirmed_sign_up(auth: &LocalAuthProvider, mailer: &RecordingMailer, email: &str) {
        auth.sign_up(email, "sugarfree1").await.unwrap();
        let code = mailer.last_code().expect("sign-up should send a confirmation link");
        auth.exchange_code_for_session(&code).await.unwrap();
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let (auth, mailer) = provider();
        let outcome = auth.sign_up(" Jo@Example.com ", "sugarfree1").await.unwrap();
        assert_eq!(outcome.user.email.as_deref(), Some("jo@example.com"));
        assert_eq!(mailer.links().len(), 1);

        let code = mailer.last_code().unwrap();
        let confirmed = auth.exchange_code_for_session(&code).await.unwrap();
        assert_eq!(confirmed.user.id, outcome.user.id);

        let session = auth
            .sign_in_with_password("jo@example.com", "sugarfree1")
            .await
            .unwrap();
        assert_eq!(session.user.id, outcome.user.id);

        let resolved = auth.get_session(&session.access_token).await.unwrap().unwrap();
        assert_eq!(resolved.session_id, session.session_id);
    }

    #[tokio::test]
    async fn test_unconfirmed_email_cannot_sign_in() {
        let (auth, _) = provider();
        auth.sign_up("jo@example.com", "sugarfree1").await.unwrap();

        let err = auth
            .sign_in_with_password("jo@example.com", "sugarfree1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailNotConfirmed));
        assert_eq!(err.to_string(), "Email not confirmed");

        // A wrong password is reported the same way whether or not the
        // address was confirmed.
        let err = auth
            .sign_in_with_password("jo@example.com", "sugarfree2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_unknown_email_hash_rejects_passwords() {
        let dummy = dummy_password_hash().unwrap();
        assert!(!verify_password("sugarfree1", dummy).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_rejected() {
        let (auth, _) = provider();
        auth.sign_up("jo@example.com", "sugarfree1").await.unwrap();
        let err = auth.sign_up("JO@example.com", "different1").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (auth, _) = provider();
        auth.sign_up("jo@example.com", "sugarfree1").await.unwrap();

        let err = auth
            .sign_in_with_password("jo@example.com", "sugarfree2")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");

        let err = auth
            .sign_in_with_password("nobody@example.com", "sugarfree1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_magic_link_exchange_is_single_use() {
        let (auth, mailer) = provider();
        auth.send_magic_link("new@example.com").await.unwrap();

        let code = mailer.last_code().expect("link should carry a code");
        let session = auth.exchange_code_for_session(&code).await.unwrap();
        assert_eq!(session.user.email.as_deref(), Some("new@example.com"));

        let again = auth.exchange_code_for_session(&code).await.unwrap_err();
        assert!(matches!(again, AuthError::InvalidCode));

        // Passwordless identities cannot sign in with a password.
        let err = auth
            .sign_in_with_password("new@example.com", "anything1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_session() {
        let (auth, mailer) = provider();
        confirmed_sign_up(&auth, &mailer, "jo@example.com").await;
        let session = auth
            .sign_in_with_password("jo@example.com", "sugarfree1")
            .await
            .unwrap();

        assert!(auth.get_user(&session.access_token).await.unwrap().is_some());
        auth.sign_out(&session).await.unwrap();
        assert!(auth.get_session(&session.access_token).await.unwrap().is_none());
        assert!(auth.get_user(&session.access_token).await.unwrap().is_none());
    }
}
