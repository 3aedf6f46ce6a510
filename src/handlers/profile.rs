use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use chrono::Utc;

use crate::auth::SessionContext;
use crate::dto::{PhotoUploadResponse, ProfileForm, ProfileResponse, ProfileSavedResponse};
use crate::error::{AppError, AppResult};
use crate::extract::JsonForm;
use crate::uploads::UploadError;
use crate::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> AppResult<Json<ProfileResponse>> {
    ctx.require_user("view your profile")?;
    let profile = ctx.profile(state.store.as_ref()).await?.cloned();
    Ok(Json(ProfileResponse { profile }))
}

pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    JsonForm(form): JsonForm<ProfileForm>,
) -> AppResult<Json<ProfileSavedResponse>> {
    let user = ctx.require_user("create a profile")?;
    let update = form.validated().map_err(AppError::Validation)?;

    let profile = state
        .store
        .upsert_profile(
            user.id,
            user.email.as_deref(),
            &update,
            Utc::now().date_naive(),
        )
        .await?;

    tracing::info!(user_id = %user.id, onboarded = profile.is_onboarded(), "Profile saved");

    Ok(Json(ProfileSavedResponse {
        success: true,
        message: "Profile created successfully".into(),
        profile,
    }))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    mut multipart: Multipart,
) -> AppResult<Json<PhotoUploadResponse>> {
    let user = ctx.require_user("upload a photo")?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
        .ok_or_else(|| AppError::field("photo", "No file provided"))?;

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

    let url = state
        .photos
        .save(user.id, &content_type, &data)
        .await
        .map_err(|e| match e {
            UploadError::Io(io) => AppError::Internal(io.into()),
            other => AppError::field("photo", &other.to_string()),
        })?;

    Ok(Json(PhotoUploadResponse { success: true, url }))
}
