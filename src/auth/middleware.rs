use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};
use tokio::sync::OnceCell;

use crate::auth::{AuthUser, Session};
use crate::error::{AppError, AppResult};
use crate::models::profile::UserProfile;
use crate::store::{RecordStore, StoreResult};
use crate::AppState;

pub const SESSION_COOKIE: &str = "nosugar_session";

/// What one request knows about its caller. The session is resolved once by
/// [`resolve_session`]; the profile is fetched at most once, on first use.
#[derive(Debug, Default)]
pub struct RequestContext {
    session: Option<Session>,
    profile: OnceCell<Option<UserProfile>>,
}

pub type SessionContext = Arc<RequestContext>;

impl RequestContext {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session,
            profile: OnceCell::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn require_user(&self, action: &str) -> AppResult<&AuthUser> {
        self.user().ok_or_else(|| AppError::must_be_logged_in(action))
    }

    /// The caller's profile row. Anonymous requests never hit the store.
    pub async fn profile(&self, store: &dyn RecordStore) -> StoreResult<Option<&UserProfile>> {
        let profile = self
            .profile
            .get_or_try_init(|| async {
                match self.user() {
                    Some(user) => store.get_profile(user.id).await,
                    None => Ok(None),
                }
            })
            .await?;
        Ok(profile.as_ref())
    }
}

/// Bearer header first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn resolve_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = match session_token(req.headers()) {
        Some(token) => match state.auth.get_session(&token).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, treating request as anonymous");
                None
            }
        },
        None => None,
    };

    req.extensions_mut()
        .insert::<SessionContext>(Arc::new(RequestContext::new(session)));
    next.run(req).await
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{AUTHORIZATION, COOKIE};
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("nosugar_session=xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; nosugar_session=xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));

        assert!(session_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_anonymous_requires_login() {
        let ctx = RequestContext::anonymous();
        let err = ctx.require_user("save your profile").unwrap_err();
        assert_eq!(err.to_string(), "You must be logged in to save your profile");
    }

    #[tokio::test]
    async fn test_anonymous_profile_is_none() {
        let store = crate::store::MemoryStore::new();
        let ctx = RequestContext::anonymous();
        assert!(ctx.profile(&store).await.unwrap().is_none());
    }
}
