use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus, PaymentMethod},
        order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
        product::{self, Entity as ProductEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        customers::CustomerService,
        promo_codes::{evaluate, PromoCodeService},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Reduces priced line items into the order subtotal.
pub fn order_subtotal(items: &[(Decimal, i32)]) -> Decimal {
    items
        .iter()
        .map(|(unit_price, quantity)| *unit_price * Decimal::from(*quantity))
        .sum::<Decimal>()
        .round_dp(2)
}

/// Human-readable order number derived from the record id.
/// One scheme only; the id makes it collision-resistant without extra state.
fn order_number_for(order_id: Uuid) -> String {
    format!("ORD-{}", order_id.to_string()[..8].to_uppercase())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "Street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Province is required"))]
    pub province: String,
    pub postal_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub customer_email: Option<String>,
    #[validate(length(min = 7, max = 20, message = "Phone number is required"))]
    pub customer_phone: String,
    #[validate]
    pub shipping_address: ShippingAddress,
    pub items: Vec<CreateOrderItem>,
    pub payment_method: PaymentMethod,
    pub promo_code: Option<String>,
    pub notes: Option<String>,
    /// Client-generated token; resubmitting the same token returns the
    /// already-created order instead of a duplicate.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub shipping_address: serde_json::Value,
    pub items: Vec<OrderItemResponse>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub promo_code_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service assembling orders at checkout and driving the status lifecycle
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    promo_codes: Arc<PromoCodeService>,
    customers: Arc<CustomerService>,
    event_sender: Option<Arc<EventSender>>,
    delivery_fee: Decimal,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        promo_codes: Arc<PromoCodeService>,
        customers: Arc<CustomerService>,
        event_sender: Option<Arc<EventSender>>,
        delivery_fee: Decimal,
    ) -> Self {
        Self {
            db,
            promo_codes,
            customers,
            event_sender,
            delivery_fee,
        }
    }

    /// Creates an order from a cart snapshot.
    ///
    /// Runs in one transaction: product resolution and stock decrement, promo
    /// evaluation and redemption, order + item inserts, and the customer
    /// aggregate update either all land or none do. The cart itself is owned
    /// by the caller and never stored here.
    #[instrument(skip(self, request), fields(customer_phone = %request.customer_phone))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }
        for item in &request.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "Quantity must be at least 1".to_string(),
                ));
            }
        }

        let idempotency_key = request
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        let txn = self.db.begin().await.map_err(ServiceError::from)?;

        // Replayed checkout: hand back the stored order untouched.
        if let Some(key) = &idempotency_key {
            if let Some(existing) = OrderEntity::find()
                .filter(order::Column::IdempotencyKey.eq(key.clone()))
                .one(&txn)
                .await
                .map_err(ServiceError::from)?
            {
                let items = self.load_items(&txn, existing.id).await?;
                txn.commit().await.map_err(ServiceError::from)?;
                info!(order_id = %existing.id, "Duplicate checkout suppressed by idempotency key");
                return Ok(to_response(existing, items));
            }
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        // Resolve products and take stock while snapshotting name and price.
        let mut priced: Vec<(Decimal, i32)> = Vec::with_capacity(request.items.len());
        let mut item_models: Vec<order_item::ActiveModel> = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = ProductEntity::find_by_id(item.product_id)
                .one(&txn)
                .await
                .map_err(ServiceError::from)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;

            if !product.active {
                return Err(ServiceError::ValidationError(format!(
                    "Product {} is not available",
                    product.name_en
                )));
            }

            let taken = ProductEntity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(item.quantity),
                )
                .filter(product::Column::Id.eq(product.id))
                .filter(product::Column::Stock.gte(item.quantity))
                .exec(&txn)
                .await
                .map_err(ServiceError::from)?;
            if taken.rows_affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "Insufficient stock for {}",
                    product.name_en
                )));
            }

            let unit_price = product.price;
            let line_total = (unit_price * Decimal::from(item.quantity)).round_dp(2);
            priced.push((unit_price, item.quantity));
            item_models.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                name: Set(product.name_en),
                quantity: Set(item.quantity),
                unit_price: Set(unit_price),
                line_total: Set(line_total),
                created_at: Set(now),
            });
        }

        let subtotal = order_subtotal(&priced);

        // Promo evaluation and redemption share the checkout transaction.
        let mut discount = Decimal::ZERO;
        let mut promo_code_id = None;
        if let Some(code) = request
            .promo_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            let promo = self
                .promo_codes
                .find_active_by_code(&txn, code)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError("Invalid promo code".to_string())
                })?;

            let evaluation = evaluate(&promo, subtotal, now);
            if !evaluation.valid {
                return Err(ServiceError::ValidationError(
                    evaluation
                        .reason
                        .unwrap_or_else(|| "Invalid promo code".to_string()),
                ));
            }

            self.promo_codes.redeem(&txn, promo.id).await?;
            discount = evaluation.discount;
            promo_code_id = Some(promo.id);
        }

        let total_amount = (subtotal - discount + self.delivery_fee).round_dp(2);
        let shipping_address = serde_json::to_value(&request.shipping_address)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number_for(order_id)),
            customer_name: Set(request.customer_name.trim().to_string()),
            customer_email: Set(request.customer_email.clone()),
            customer_phone: Set(request.customer_phone.trim().to_string()),
            shipping_address: Set(shipping_address.clone()),
            subtotal: Set(subtotal),
            delivery_fee: Set(self.delivery_fee),
            discount_amount: Set(discount),
            total_amount: Set(total_amount),
            promo_code_id: Set(promo_code_id),
            payment_method: Set(request.payment_method),
            status: Set(OrderStatus::Pending),
            notes: Set(request.notes.clone()),
            idempotency_key: Set(idempotency_key),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };

        let order = order_model.insert(&txn).await.map_err(ServiceError::from)?;

        let mut items = Vec::with_capacity(item_models.len());
        for item_model in item_models {
            items.push(item_model.insert(&txn).await.map_err(ServiceError::from)?);
        }

        self.customers
            .record_order(
                &txn,
                order.customer_name.as_str(),
                order.customer_email.as_deref(),
                order.customer_phone.as_str(),
                &shipping_address,
                total_amount,
            )
            .await?;

        txn.commit().await.map_err(ServiceError::from)?;

        info!(
            order_id = %order_id,
            order_number = %order.order_number,
            total = %total_amount,
            "Order created"
        );

        self.emit(Event::OrderCreated(order_id)).await;
        if let Some(promo_id) = promo_code_id {
            self.emit(Event::PromoCodeRedeemed {
                promo_code_id: promo_id,
                order_id,
            })
            .await;
        }

        Ok(to_response(order, items))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderResponse>, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)?;

        match order {
            Some(order) => {
                let items = self.load_items(&*self.db, order.id).await?;
                Ok(Some(to_response(order, items)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(order_number = %order_number))]
    pub async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderResponse>, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number.trim().to_uppercase()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)?;

        match order {
            Some(order) => {
                let items = self.load_items(&*self.db, order.id).await?;
                Ok(Some(to_response(order, items)))
            }
            None => Ok(None),
        }
    }

    /// Admin listing, newest first, optionally narrowed to one status
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        status: Option<OrderStatus>,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = OrderEntity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from)?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from)?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
        if !ids.is_empty() {
            let items = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.is_in(ids))
                .all(&*self.db)
                .await
                .map_err(ServiceError::from)?;
            for item in items {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }

        let orders = orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                to_response(order, items)
            })
            .collect();

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Moves an order through the status machine.
    ///
    /// Rejects transitions outside the table on [`OrderStatus`]; repeating
    /// the current status succeeds without touching the row.
    #[instrument(skip(self, request), fields(order_id = %order_id, new_status = ?request.status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::from)?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        let new_status = request.status;

        if old_status == new_status {
            let items = self.load_items(&txn, order.id).await?;
            txn.commit().await.map_err(ServiceError::from)?;
            return Ok(to_response(order, items));
        }

        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot transition from '{}' to '{}'",
                old_status.as_str(),
                new_status.as_str()
            )));
        }

        let version = order.version;
        let mut active_model: order::ActiveModel = order.into();
        active_model.status = Set(new_status);
        if let Some(notes) = request.notes {
            active_model.notes = Set(Some(notes));
        }
        active_model.updated_at = Set(Some(Utc::now()));
        active_model.version = Set(version + 1);

        let updated = active_model
            .update(&txn)
            .await
            .map_err(ServiceError::from)?;
        let items = self.load_items(&txn, updated.id).await?;

        txn.commit().await.map_err(ServiceError::from)?;

        info!(
            order_id = %order_id,
            old_status = old_status.as_str(),
            new_status = new_status.as_str(),
            "Order status updated"
        );

        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status: old_status.as_str().to_string(),
            new_status: new_status.as_str().to_string(),
        })
        .await;

        Ok(to_response(updated, items))
    }

    async fn load_items<C: ConnectionTrait>(
        &self,
        db: &C,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemModel>, ServiceError> {
        OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::from)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send order event");
            }
        }
    }
}

fn to_response(order: OrderModel, items: Vec<OrderItemModel>) -> OrderResponse {
    OrderResponse {
        id: order.id,
        order_number: order.order_number,
        customer_name: order.customer_name,
        customer_email: order.customer_email,
        customer_phone: order.customer_phone,
        shipping_address: order.shipping_address,
        items: items
            .into_iter()
            .map(|item| OrderItemResponse {
                product_id: item.product_id,
                name: item.name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total,
            })
            .collect(),
        subtotal: order.subtotal,
        delivery_fee: order.delivery_fee,
        discount_amount: order.discount_amount,
        total_amount: order.total_amount,
        promo_code_id: order.promo_code_id,
        payment_method: order.payment_method,
        status: order.status,
        notes: order.notes,
        created_at: order.created_at,
        updated_at: order.updated_at,
        version: order.version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn subtotal_sums_price_times_quantity() {
        let items = vec![(dec!(2500.00), 2), (dec!(100.50), 3)];
        assert_eq!(order_subtotal(&items), dec!(5301.50));
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() {
        assert_eq!(order_subtotal(&[]), Decimal::ZERO);
    }

    #[test]
    fn subtotal_single_item_single_unit() {
        let items = vec![(dec!(1990.00), 1)];
        assert_eq!(order_subtotal(&items), dec!(1990.00));
    }

    #[test]
    fn order_number_is_prefixed_and_stable() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(order_number_for(id), "ORD-550E8400");
        // derived from the id, so regenerating gives the same number
        assert_eq!(order_number_for(id), order_number_for(id));
    }

    #[test]
    fn order_numbers_differ_for_different_orders() {
        let a = order_number_for(Uuid::new_v4());
        let b = order_number_for(Uuid::new_v4());
        assert!(a.starts_with("ORD-"));
        assert!(b.starts_with("ORD-"));
        assert_ne!(a, b);
    }
}
