use axum::{
    extract::{Query, State},
    response::Redirect,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::auth::middleware::{expired_session_cookie, session_cookie};
use crate::auth::{Session, SessionContext};
use crate::dto::{
    field_errors, CallbackQuery, MagicLinkForm, MessageResponse, SessionResponse, SignInForm,
    SignInResponse, SignUpForm,
};
use crate::error::{AppError, AppResult};
use crate::extract::JsonForm;
use crate::AppState;

fn with_session_cookie(state: &AppState, jar: CookieJar, session: &Session) -> CookieJar {
    jar.add(session_cookie(
        session.access_token.clone(),
        state.config.session_cookie_secure(),
    ))
}

pub async fn sign_up(
    State(state): State<AppState>,
    JsonForm(form): JsonForm<SignUpForm>,
) -> AppResult<Json<MessageResponse>> {
    form.validate()
        .map_err(|e| AppError::Validation(field_errors(&e)))?;

    let outcome = state.auth.sign_up(&form.email, &form.password).await?;
    state
        .store
        .ensure_profile(outcome.user.id, outcome.user.email.as_deref())
        .await?;

    Ok(Json(MessageResponse::ok(
        "Please check your email to confirm your account",
    )))
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonForm(form): JsonForm<SignInForm>,
) -> AppResult<(CookieJar, Json<SignInResponse>)> {
    form.validate()
        .map_err(|e| AppError::Validation(field_errors(&e)))?;

    let session = state
        .auth
        .sign_in_with_password(&form.email, &form.password)
        .await?;
    state
        .store
        .ensure_profile(session.user.id, session.user.email.as_deref())
        .await?;

    tracing::info!(user_id = %session.user.id, "User signed in");

    let jar = with_session_cookie(&state, jar, &session);
    Ok((jar, Json(SignInResponse::from(&session))))
}

pub async fn magic_link(
    State(state): State<AppState>,
    JsonForm(form): JsonForm<MagicLinkForm>,
) -> AppResult<Json<MessageResponse>> {
    form.validate()
        .map_err(|e| AppError::Validation(field_errors(&e)))?;
    let email = form
        .email
        .as_deref()
        .ok_or_else(|| AppError::field("email", "Email is required"))?;

    state.auth.send_magic_link(email).await?;

    Ok(Json(MessageResponse::ok("Check your email for the sign-in link")))
}

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    if let Some(session) = ctx.session() {
        state.auth.sign_out(session).await?;
    }

    Ok((jar.remove(expired_session_cookie()), Redirect::to("/")))
}

pub async fn session(Extension(ctx): Extension<SessionContext>) -> Json<SessionResponse> {
    Json(SessionResponse {
        session: ctx.session().cloned(),
    })
}

/// Landing point of confirmation and magic links. Always continues to
/// onboarding; the route guard forwards onboarded users to the dashboard.
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> (CookieJar, Redirect) {
    let redirect = Redirect::to("/onboarding");
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return (jar, redirect);
    };

    let session = match state.auth.exchange_code_for_session(&code).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Auth callback code exchange failed");
            return (jar, redirect);
        }
    };

    let user = match state.auth.get_user(&session.access_token).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(user_id = %session.user.id, "Exchanged session did not resolve to a user");
            return (jar, redirect);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Auth callback user lookup failed");
            return (jar, redirect);
        }
    };

    if let Err(e) = state
        .store
        .ensure_profile(user.id, user.email.as_deref())
        .await
    {
        tracing::error!(error = %e, user_id = %user.id, "Failed to create profile row");
    }

    (with_session_cookie(&state, jar, &session), redirect)
}
