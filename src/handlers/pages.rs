//! Page routes. The route guard has already settled who may see each page;
//! these handlers only assemble the view model.

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::SessionContext;
use crate::error::AppResult;
use crate::views::{DashboardView, FoodEntriesView, LogFormView, OnboardingView, ProgressView};
use crate::AppState;

pub async fn landing(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> Json<Value> {
    Json(json!({
        "title": "No Sugar Challenge",
        "challenge_days": state.config.challenge_days,
        "signed_in": ctx.user().is_some(),
    }))
}

pub async fn sign_in_page() -> Json<Value> {
    Json(json!({
        "page": "sign-in",
        "methods": ["password", "magic_link"],
    }))
}

pub async fn sign_up_page() -> Json<Value> {
    Json(json!({
        "page": "sign-up",
        "password_min_length": 8,
    }))
}

pub async fn onboarding(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> AppResult<Json<OnboardingView>> {
    ctx.require_user("complete onboarding")?;
    let profile = ctx.profile(state.store.as_ref()).await?.cloned();
    Ok(Json(OnboardingView::build(profile)))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> AppResult<Json<DashboardView>> {
    let user = ctx.require_user("view the dashboard")?;
    let profile = ctx.profile(state.store.as_ref()).await?;
    let logs = state.store.list_daily_logs(user.id, None, None).await?;

    Ok(Json(DashboardView::build(
        profile,
        &logs,
        Utc::now().date_naive(),
        state.config.challenge_days,
    )))
}

pub async fn log_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> AppResult<Json<LogFormView>> {
    let user = ctx.require_user("log your day")?;
    let today = Utc::now().date_naive();
    let existing = state.store.get_daily_log(user.id, today).await?;
    Ok(Json(LogFormView::build(today, existing)))
}

pub async fn progress(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> AppResult<Json<ProgressView>> {
    let user = ctx.require_user("view your progress")?;
    let today = Utc::now().date_naive();
    let (start, end) = ProgressView::window(today);
    let logs = state
        .store
        .list_daily_logs(user.id, Some(start), Some(end))
        .await?;
    Ok(Json(ProgressView::build(&logs, today)))
}

pub async fn food_entries(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> AppResult<Json<FoodEntriesView>> {
    let user = ctx.require_user("view food entries")?;
    let logs = state.store.list_daily_logs(user.id, None, None).await?;
    Ok(Json(FoodEntriesView::build(&logs)))
}
