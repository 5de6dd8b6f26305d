use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::handlers::common::validate_input;
use crate::services::orders::{
    CreateOrderRequest, OrderListResponse, OrderResponse, UpdateOrderStatusRequest,
};
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Checkout and order-confirmation routes
pub fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/by-number/:order_number", get(get_order_by_number))
}

/// Back-office order review routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_order_status))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Narrow the listing to one status
    pub status: Option<OrderStatus>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

/// Submit a checkout and create the order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created (or replayed via idempotency key)", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid payload or rejected promo code", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    validate_input(&payload)?;
    let order = state.services.orders.create_order(payload).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Order confirmation lookup by human-readable number
#[utoipa::path(
    get,
    path = "/api/v1/orders/by-number/{order_number}",
    params(("order_number" = String, Path, description = "Human-readable order number")),
    responses(
        (status = 200, description = "Order detail", body = crate::ApiResponse<OrderResponse>),
        (status = 404, description = "Unknown order number", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order_by_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state
        .services
        .orders
        .get_order_by_number(&order_number)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))?;
    Ok(Json(ApiResponse::success(order)))
}

/// Admin order listing
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(OrderListParams),
    responses(
        (status = 200, description = "Orders, newest first", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let page = params.page.max(1);
    let per_page = params.per_page.clamp(1, 100);
    let orders = state
        .services
        .orders
        .list_orders(page, per_page, params.status)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state
        .services
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
    Ok(Json(ApiResponse::success(order)))
}

/// Update an order's status (validated against the transition table)
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order with the new status", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    validate_input(&payload)?;
    let order = state.services.orders.update_status(id, payload).await?;
    Ok(Json(ApiResponse::success(order)))
}
