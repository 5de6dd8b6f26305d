use crate::{
    db::DbPool,
    entities::product::{self, Entity as Product, Model as ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "English name is required"))]
    pub name_en: String,
    #[validate(length(min = 1, max = 200, message = "Sinhala name is required"))]
    pub name_si: String,
    /// Derived from `name_en` when omitted
    pub slug: Option<String>,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub description_si: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    pub sku: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_active() -> bool {
    true
}

fn default_category() -> String {
    "herbal".to_string()
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub name_en: Option<String>,
    pub name_si: Option<String>,
    pub description_en: Option<String>,
    pub description_si: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub sku: Option<String>,
    pub images: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub active: Option<bool>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Catalog service: storefront reads see active products only, the admin
/// surface sees and mutates everything.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Storefront catalog: active products, featured first, then newest
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<ProductModel>, ServiceError> {
        Product::find()
            .filter(product::Column::Active.eq(true))
            .order_by_desc(product::Column::Featured)
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    pub async fn get_active_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductModel>, ServiceError> {
        Product::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::Active.eq(true))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    /// Case-insensitive substring search over names and English description
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<ProductModel>, ServiceError> {
        let term = query.trim();
        if term.is_empty() {
            return self.list_active().await;
        }

        Product::find()
            .filter(product::Column::Active.eq(true))
            .filter(
                Condition::any()
                    .add(product::Column::NameEn.contains(term))
                    .add(product::Column::NameSi.contains(term))
                    .add(product::Column::DescriptionEn.contains(term)),
            )
            .order_by_desc(product::Column::Featured)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    /// Admin listing including inactive products
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let paginator = Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::from)?;
        let products = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from)?;

        Ok(ProductListResponse {
            products,
            total,
            page,
            per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ProductModel>, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self, request), fields(name = %request.name_en))]
    pub async fn create(&self, request: CreateProductRequest) -> Result<ProductModel, ServiceError> {
        request.validate()?;

        if request.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }
        if request.stock < 0 {
            return Err(ServiceError::ValidationError(
                "Stock cannot be negative".to_string(),
            ));
        }

        let slug = match request.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(given) => slugify(given),
            None => slugify(&request.name_en),
        };
        if slug.is_empty() {
            return Err(ServiceError::ValidationError(
                "Slug cannot be derived from the product name".to_string(),
            ));
        }

        let duplicate = Product::find()
            .filter(product::Column::Slug.eq(slug.clone()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product slug {} already exists",
                slug
            )));
        }

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name_en: Set(request.name_en),
            name_si: Set(request.name_si),
            slug: Set(slug),
            description_en: Set(request.description_en),
            description_si: Set(request.description_si),
            price: Set(request.price.round_dp(2)),
            compare_at_price: Set(request.compare_at_price.map(|p| p.round_dp(2))),
            stock: Set(request.stock),
            sku: Set(request.sku),
            images: Set(serde_json::json!(request.images)),
            featured: Set(request.featured),
            active: Set(request.active),
            category: Set(request.category),
            tags: Set(serde_json::json!(request.tags)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await.map_err(ServiceError::from)?;
        info!(product_id = %created.id, slug = %created.slug, "Product created");

        self.emit(Event::ProductCreated(created.id)).await;

        Ok(created)
    }

    #[instrument(skip(self, request), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        let existing = Product::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        if let Some(price) = request.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Price cannot be negative".to_string(),
                ));
            }
        }
        if let Some(stock) = request.stock {
            if stock < 0 {
                return Err(ServiceError::ValidationError(
                    "Stock cannot be negative".to_string(),
                ));
            }
        }

        let mut active_model: product::ActiveModel = existing.into();
        if let Some(name_en) = request.name_en {
            active_model.name_en = Set(name_en);
        }
        if let Some(name_si) = request.name_si {
            active_model.name_si = Set(name_si);
        }
        if let Some(description_en) = request.description_en {
            active_model.description_en = Set(description_en);
        }
        if let Some(description_si) = request.description_si {
            active_model.description_si = Set(description_si);
        }
        if let Some(price) = request.price {
            active_model.price = Set(price.round_dp(2));
        }
        if let Some(compare_at_price) = request.compare_at_price {
            active_model.compare_at_price = Set(Some(compare_at_price.round_dp(2)));
        }
        if let Some(stock) = request.stock {
            active_model.stock = Set(stock);
        }
        if let Some(sku) = request.sku {
            active_model.sku = Set(Some(sku));
        }
        if let Some(images) = request.images {
            active_model.images = Set(serde_json::json!(images));
        }
        if let Some(featured) = request.featured {
            active_model.featured = Set(featured);
        }
        if let Some(active) = request.active {
            active_model.active = Set(active);
        }
        if let Some(category) = request.category {
            active_model.category = Set(category);
        }
        if let Some(tags) = request.tags {
            active_model.tags = Set(serde_json::json!(tags));
        }
        active_model.updated_at = Set(Utc::now());

        let updated = active_model
            .update(&*self.db)
            .await
            .map_err(ServiceError::from)?;
        info!(product_id = %id, "Product updated");

        self.emit(Event::ProductUpdated(id)).await;

        Ok(updated)
    }

    /// Hides the product from the storefront without touching order history
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn archive(&self, id: Uuid) -> Result<ProductModel, ServiceError> {
        let existing = Product::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let mut active_model: product::ActiveModel = existing.into();
        active_model.active = Set(false);
        active_model.updated_at = Set(Utc::now());

        let archived = active_model
            .update(&*self.db)
            .await
            .map_err(ServiceError::from)?;
        info!(product_id = %id, "Product archived");

        self.emit(Event::ProductArchived(id)).await;

        Ok(archived)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::from)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send catalog event");
            }
        }
    }
}

/// Lowercases and collapses non-alphanumeric runs into single dashes.
fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Herbal Hair Oil"), "herbal-hair-oil");
        assert_eq!(slugify("  Herbal   Hair--Oil  "), "herbal-hair-oil");
        assert_eq!(slugify("100% Natural!"), "100-natural");
    }

    #[test]
    fn slugify_drops_non_ascii() {
        // Sinhala names fall back to whatever ASCII the string carries
        assert_eq!(slugify("සුව Oil"), "oil");
        assert_eq!(slugify("සුව"), "");
    }
}
