use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::entities::customer::Model as CustomerModel;
use crate::services::customers::CustomerListResponse;
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Back-office customer review (read-only; records are built at checkout)
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers))
        .route("/:id", get(get_customer))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CustomerListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Substring match on name or phone
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/customers",
    params(CustomerListParams),
    responses(
        (status = 200, description = "Customers, newest first", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "Admin"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<ApiResponse<CustomerListResponse>>, ServiceError> {
    let page = params.page.max(1);
    let per_page = params.per_page.clamp(1, 100);
    let customers = state
        .services
        .customers
        .list(page, per_page, params.search)
        .await?;
    Ok(Json(ApiResponse::success(customers)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CustomerModel>>, ServiceError> {
    let customer = state
        .services
        .customers
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))?;
    Ok(Json(ApiResponse::success(customer)))
}
