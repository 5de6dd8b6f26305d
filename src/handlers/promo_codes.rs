use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::promo_code::Model as PromoCodeModel;
use crate::handlers::common::{validate_input, PaginationParams};
use crate::services::promo_codes::{
    CreatePromoCodeRequest, Evaluation, PromoCodeListResponse, UpdatePromoCodeRequest,
};
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Storefront validation route
pub fn storefront_routes() -> Router<AppState> {
    Router::new().route("/validate", post(validate_promo_code))
}

/// Back-office promo code management
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promo_codes).post(create_promo_code))
        .route(
            "/:id",
            get(get_promo_code)
                .put(update_promo_code)
                .delete(delete_promo_code),
        )
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ValidatePromoCodeRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    pub order_amount: Decimal,
}

/// Check a promo code against an order amount.
///
/// Ineligibility is data (`valid: false` plus a reason), not an error
/// status; the storefront shows the reason inline at checkout.
#[utoipa::path(
    post,
    path = "/api/v1/promo-codes/validate",
    request_body = ValidatePromoCodeRequest,
    responses(
        (status = 200, description = "Evaluation result", body = crate::ApiResponse<Evaluation>),
        (status = 400, description = "Malformed request", body = crate::errors::ErrorResponse)
    ),
    tag = "Promo Codes"
)]
pub async fn validate_promo_code(
    State(state): State<AppState>,
    Json(payload): Json<ValidatePromoCodeRequest>,
) -> Result<Json<ApiResponse<Evaluation>>, ServiceError> {
    validate_input(&payload)?;

    if payload.order_amount < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Order amount cannot be negative".to_string(),
        ));
    }

    let evaluation = state
        .services
        .promo_codes
        .validate(&payload.code, payload.order_amount)
        .await?;
    Ok(Json(ApiResponse::success(evaluation)))
}

pub async fn list_promo_codes(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PromoCodeListResponse>>, ServiceError> {
    let (page, per_page) = pagination.clamped();
    let promo_codes = state.services.promo_codes.list(page, per_page).await?;
    Ok(Json(ApiResponse::success(promo_codes)))
}

pub async fn get_promo_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PromoCodeModel>>, ServiceError> {
    let promo_code = state
        .services
        .promo_codes
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Promo code {} not found", id)))?;
    Ok(Json(ApiResponse::success(promo_code)))
}

/// Create a promo code
#[utoipa::path(
    post,
    path = "/api/v1/admin/promo-codes",
    request_body = CreatePromoCodeRequest,
    responses(
        (status = 200, description = "Promo code created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate code", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn create_promo_code(
    State(state): State<AppState>,
    Json(payload): Json<CreatePromoCodeRequest>,
) -> Result<Json<ApiResponse<PromoCodeModel>>, ServiceError> {
    let promo_code = state.services.promo_codes.create(payload).await?;
    Ok(Json(ApiResponse::success(promo_code)))
}

pub async fn update_promo_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePromoCodeRequest>,
) -> Result<Json<ApiResponse<PromoCodeModel>>, ServiceError> {
    let promo_code = state.services.promo_codes.update(id, payload).await?;
    Ok(Json(ApiResponse::success(promo_code)))
}

pub async fn delete_promo_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.promo_codes.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted": id
    }))))
}
