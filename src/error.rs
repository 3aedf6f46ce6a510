use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::AuthError;
use crate::store::StoreError;

/// Field name -> messages, the shape forms render next to each input.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn must_be_logged_in(action: &str) -> Self {
        AppError::Unauthorized(format!("You must be logged in to {}", action))
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.to_string()]);
        AppError::Validation(fields)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Store(e) => e.into(),
            AuthError::Token(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            AuthError::Hashing(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            AuthError::Delivery(msg) => AppError::Provider(msg),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

/// Prefix axum puts in front of serde's message for body data errors.
const JSON_DATA_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Turns serde's `path: message` (or `missing field `name``) into a field map.
fn rejected_fields(body_text: &str) -> FieldErrors {
    let detail = body_text.strip_prefix(JSON_DATA_PREFIX).unwrap_or(body_text);

    let (field, message) = if let Some(name) = detail
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
        .map(|(name, _)| name)
    {
        (name, "This field is required")
    } else {
        match detail.split_once(": ") {
            Some((path, _))
                if !path.is_empty()
                    && path
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || "_.[]".contains(c)) =>
            {
                (path, "Invalid value")
            }
            _ => ("body", "Invalid request body"),
        }
    };

    let mut fields = FieldErrors::new();
    fields.insert(field.to_string(), vec![message.to_string()]);
    fields
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => AppError::Validation(rejected_fields(&e.body_text())),
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Provider(msg) => {
                tracing::warn!(error = %msg, "Upstream provider error");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        let body = match self {
            AppError::Validation(fields) => json!({
                "error": {
                    "message": message,
                    "code": status.as_u16(),
                    "fields": fields,
                }
            }),
            _ => json!({
                "error": {
                    "message": message,
                    "code": status.as_u16(),
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
