use crate::{
    db::DbPool,
    entities::customer::{self, Entity as Customer, Model as CustomerModel},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service maintaining the customer aggregate built up from checkouts
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Folds a new order into the customer record keyed by phone number,
    /// creating it on first purchase. Runs on the checkout transaction.
    pub async fn record_order<C: ConnectionTrait>(
        &self,
        db: &C,
        name: &str,
        email: Option<&str>,
        phone: &str,
        shipping_address: &serde_json::Value,
        order_total: Decimal,
    ) -> Result<Uuid, ServiceError> {
        let now = Utc::now();

        let existing = Customer::find()
            .filter(customer::Column::Phone.eq(phone))
            .one(db)
            .await
            .map_err(ServiceError::from)?;

        match existing {
            Some(model) => {
                let id = model.id;
                let mut addresses = model.addresses.as_array().cloned().unwrap_or_default();
                if !addresses.iter().any(|known| known == shipping_address) {
                    addresses.push(shipping_address.clone());
                }
                let total_orders = model.total_orders + 1;
                let total_spent = model.total_spent + order_total;

                let mut active_model: customer::ActiveModel = model.into();
                active_model.name = Set(name.to_string());
                if email.is_some() {
                    active_model.email = Set(email.map(str::to_string));
                }
                active_model.addresses = Set(serde_json::Value::Array(addresses));
                active_model.total_orders = Set(total_orders);
                active_model.total_spent = Set(total_spent);
                active_model.updated_at = Set(now);
                active_model.update(db).await.map_err(ServiceError::from)?;

                Ok(id)
            }
            None => {
                let id = Uuid::new_v4();
                let model = customer::ActiveModel {
                    id: Set(id),
                    name: Set(name.to_string()),
                    email: Set(email.map(str::to_string)),
                    phone: Set(phone.to_string()),
                    addresses: Set(serde_json::Value::Array(vec![shipping_address.clone()])),
                    total_orders: Set(1),
                    total_spent: Set(order_total),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                model.insert(db).await.map_err(ServiceError::from)?;
                info!(customer_id = %id, "Customer created");

                Ok(id)
            }
        }
    }

    /// Admin listing, newest first, with optional name/phone search
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<CustomerListResponse, ServiceError> {
        let mut query = Customer::find().order_by_desc(customer::Column::CreatedAt);

        if let Some(term) = search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(customer::Column::Name.contains(term))
                    .add(customer::Column::Phone.contains(term)),
            );
        }

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from)?;
        let customers = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from)?;

        Ok(CustomerListResponse {
            customers,
            total,
            page,
            per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<CustomerModel>, ServiceError> {
        Customer::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)
    }
}
