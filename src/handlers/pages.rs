use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::entities::page::Model as PageModel;
use crate::handlers::common::validate_input;
use crate::services::pages::{CreatePageRequest, UpdatePageRequest};
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Public policy-page lookup
pub fn storefront_routes() -> Router<AppState> {
    Router::new().route("/:slug", get(get_page_by_slug))
}

/// Back-office content management
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pages).post(create_page))
        .route("/:id", axum::routing::put(update_page).delete(delete_page))
}

#[utoipa::path(
    get,
    path = "/api/v1/pages/{slug}",
    params(("slug" = String, Path, description = "Page slug, e.g. privacy-policy")),
    responses(
        (status = 200, description = "Page content", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown page", body = crate::errors::ErrorResponse)
    ),
    tag = "Pages"
)]
pub async fn get_page_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<PageModel>>, ServiceError> {
    let page = state
        .services
        .pages
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Page {} not found", slug)))?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn list_pages(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PageModel>>>, ServiceError> {
    let pages = state.services.pages.list().await?;
    Ok(Json(ApiResponse::success(pages)))
}

pub async fn create_page(
    State(state): State<AppState>,
    Json(payload): Json<CreatePageRequest>,
) -> Result<Json<ApiResponse<PageModel>>, ServiceError> {
    validate_input(&payload)?;
    let page = state.services.pages.create(payload).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn update_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePageRequest>,
) -> Result<Json<ApiResponse<PageModel>>, ServiceError> {
    let page = state.services.pages.update(id, payload).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn delete_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.pages.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted": id
    }))))
}
