use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` for form bodies. Rejections come back in the app's error
/// envelope, with undecodable fields named in `fields`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonForm<T>(pub T);
