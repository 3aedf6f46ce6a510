use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::auth::SessionContext;
use crate::dto::{validate_barcode, ProductLookupQuery};
use crate::error::{AppError, AppResult};
use crate::nutrition::LookupError;
use crate::AppState;

pub async fn lookup_product(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<ProductLookupQuery>,
) -> AppResult<Json<Value>> {
    let user = ctx.require_user("look up products")?;

    let barcode = query
        .barcode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::field("barcode", "Barcode is required"))?;
    validate_barcode(barcode)
        .map_err(|_| AppError::field("barcode", "Please enter a valid barcode"))?;

    match state.nutrition.lookup(barcode).await {
        Ok(product) => {
            tracing::info!(user_id = %user.id, barcode = %barcode, "Product found");
            Ok(Json(json!({ "product": product })))
        }
        Err(LookupError::NotFound) => Err(AppError::NotFound("Product not found".into())),
        Err(e) => {
            tracing::error!(error = %e, barcode = %barcode, "Product lookup failed");
            Err(AppError::Provider("Failed to look up product".into()))
        }
    }
}
