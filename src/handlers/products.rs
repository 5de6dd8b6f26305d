use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::entities::product::Model as ProductModel;
use crate::handlers::common::{validate_input, PaginationParams};
use crate::services::products::{CreateProductRequest, ProductListResponse, UpdateProductRequest};
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Storefront catalog routes (active products only)
pub fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/search", get(search_products))
        .route("/:slug", get(get_product_by_slug))
}

/// Back-office catalog routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_products).post(create_product))
        .route(
            "/:id",
            get(admin_get_product)
                .put(update_product)
                .delete(delete_product),
        )
        .route("/:id/archive", post(archive_product))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    pub q: String,
}

/// List the storefront catalog
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses(
        (status = 200, description = "Active products, featured first", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProductModel>>>, ServiceError> {
    let products = state.services.catalog.list_active().await?;
    Ok(Json(ApiResponse::success(products)))
}

/// Search the storefront catalog
#[utoipa::path(
    get,
    path = "/api/v1/products/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching active products", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<ProductModel>>>, ServiceError> {
    let products = state.services.catalog.search(&query.q).await?;
    Ok(Json(ApiResponse::success(products)))
}

/// Fetch a single product by its slug
#[utoipa::path(
    get,
    path = "/api/v1/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product detail", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown or inactive product", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ProductModel>>, ServiceError> {
    let product = state
        .services
        .catalog
        .get_active_by_slug(&slug)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", slug)))?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn admin_list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<ProductListResponse>>, ServiceError> {
    let (page, per_page) = pagination.clamped();
    let products = state.services.catalog.list_all(page, per_page).await?;
    Ok(Json(ApiResponse::success(products)))
}

pub async fn admin_get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductModel>>, ServiceError> {
    let product = state
        .services
        .catalog
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
    Ok(Json(ApiResponse::success(product)))
}

/// Create a catalog product
#[utoipa::path(
    post,
    path = "/api/v1/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate slug", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Json<ApiResponse<ProductModel>>, ServiceError> {
    validate_input(&payload)?;
    let product = state.services.catalog.create(payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductModel>>, ServiceError> {
    let product = state.services.catalog.update(id, payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn archive_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductModel>>, ServiceError> {
    let product = state.services.catalog.archive(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.catalog.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted": id
    }))))
}
