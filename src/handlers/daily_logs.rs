use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::auth::SessionContext;
use crate::dto::{parse_iso_date, DailyLogForm, DailyLogSavedResponse};
use crate::error::{AppError, AppResult};
use crate::extract::JsonForm;
use crate::models::daily_log::{DailyLog, DailyLogQuery};
use crate::AppState;

pub async fn create_daily_log(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    JsonForm(form): JsonForm<DailyLogForm>,
) -> AppResult<Json<DailyLogSavedResponse>> {
    let user = ctx.require_user("create a log")?;
    let entry = form.validated().map_err(AppError::Validation)?;

    let log = state.store.upsert_daily_log(user.id, &entry).await?;
    tracing::info!(user_id = %user.id, date = %log.date, "Daily log saved");

    Ok(Json(DailyLogSavedResponse {
        success: true,
        message: "Log saved successfully".into(),
        log,
    }))
}

/// Signed-out callers get an empty list rather than an error.
pub async fn list_daily_logs(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<DailyLogQuery>,
) -> AppResult<Json<Vec<DailyLog>>> {
    let Some(user) = ctx.user() else {
        return Ok(Json(Vec::new()));
    };

    let logs = state
        .store
        .list_daily_logs(user.id, query.start_date, query.end_date)
        .await?;
    Ok(Json(logs))
}

pub async fn get_daily_log_by_date(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(date): Path<String>,
) -> AppResult<Json<Option<DailyLog>>> {
    let date = parse_iso_date(&date)
        .ok_or_else(|| AppError::field("date", "Date must be in YYYY-MM-DD format"))?;
    let Some(user) = ctx.user() else {
        return Ok(Json(None));
    };

    let log = state.store.get_daily_log(user.id, date).await?;
    Ok(Json(log))
}
