use crate::{
    db::DbPool,
    entities::page::{self, Entity as Page, Model as PageModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePageRequest {
    #[validate(length(min = 1, max = 100, message = "Slug is required"))]
    pub slug: String,
    #[validate(length(min = 1, message = "English title is required"))]
    pub title_en: String,
    #[validate(length(min = 1, message = "Sinhala title is required"))]
    pub title_si: String,
    #[serde(default)]
    pub body_en: String,
    #[serde(default)]
    pub body_si: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePageRequest {
    pub title_en: Option<String>,
    pub title_si: Option<String>,
    pub body_en: Option<String>,
    pub body_si: Option<String>,
}

/// Service for policy/static pages edited from the back office
#[derive(Clone)]
pub struct PageService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PageService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<PageModel>, ServiceError> {
        Page::find()
            .filter(page::Column::Slug.eq(slug))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    pub async fn list(&self) -> Result<Vec<PageModel>, ServiceError> {
        Page::find()
            .order_by_asc(page::Column::Slug)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self, request), fields(slug = %request.slug))]
    pub async fn create(&self, request: CreatePageRequest) -> Result<PageModel, ServiceError> {
        request.validate()?;

        let slug = request.slug.trim().to_lowercase();
        let existing = self.get_by_slug(&slug).await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Page {} already exists",
                slug
            )));
        }

        let model = page::ActiveModel {
            id: Set(Uuid::new_v4()),
            slug: Set(slug.clone()),
            title_en: Set(request.title_en),
            title_si: Set(request.title_si),
            body_en: Set(request.body_en),
            body_si: Set(request.body_si),
            updated_at: Set(Utc::now()),
        };

        let created = model.insert(&*self.db).await.map_err(ServiceError::from)?;
        info!(slug = %slug, "Page created");

        self.emit(Event::PageUpdated(slug)).await;

        Ok(created)
    }

    #[instrument(skip(self, request), fields(page_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdatePageRequest,
    ) -> Result<PageModel, ServiceError> {
        let existing = Page::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)?
            .ok_or_else(|| ServiceError::NotFound(format!("Page {} not found", id)))?;

        let slug = existing.slug.clone();
        let mut active_model: page::ActiveModel = existing.into();
        if let Some(title_en) = request.title_en {
            active_model.title_en = Set(title_en);
        }
        if let Some(title_si) = request.title_si {
            active_model.title_si = Set(title_si);
        }
        if let Some(body_en) = request.body_en {
            active_model.body_en = Set(body_en);
        }
        if let Some(body_si) = request.body_si {
            active_model.body_si = Set(body_si);
        }
        active_model.updated_at = Set(Utc::now());

        let updated = active_model
            .update(&*self.db)
            .await
            .map_err(ServiceError::from)?;
        info!(slug = %slug, "Page updated");

        self.emit(Event::PageUpdated(slug)).await;

        Ok(updated)
    }

    #[instrument(skip(self), fields(page_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Page::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::from)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Page {} not found", id)));
        }

        info!(page_id = %id, "Page deleted");
        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send page event");
            }
        }
    }
}
