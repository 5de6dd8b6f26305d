use crate::{
    db::DbPool,
    entities::promo_code::{self, Entity as PromoCode, Model as PromoCodeModel, PromoKind},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Outcome of evaluating a promo code against an order amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Evaluation {
    pub valid: bool,
    pub discount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Evaluation {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount: Decimal::ZERO,
            reason: Some(reason.into()),
        }
    }

    pub fn applied(discount: Decimal) -> Self {
        Self {
            valid: true,
            discount,
            reason: None,
        }
    }
}

/// Applies the eligibility rules and computes the discount for one code.
///
/// Read-only: calling it any number of times with the same inputs yields the
/// same result. The resulting discount is clamped so it can never exceed the
/// order amount or go negative.
///
/// A code at exactly `valid_to` is still accepted; only `now > valid_to`
/// counts as expired.
pub fn evaluate(promo: &PromoCodeModel, order_amount: Decimal, now: DateTime<Utc>) -> Evaluation {
    if !promo.active {
        return Evaluation::rejected("Invalid promo code");
    }

    if now < promo.valid_from {
        return Evaluation::rejected("Promo code not yet active");
    }

    if let Some(valid_to) = promo.valid_to {
        if now > valid_to {
            return Evaluation::rejected("Promo code has expired");
        }
    }

    if order_amount < promo.min_order_amount {
        return Evaluation::rejected(format!(
            "Minimum order amount is {} LKR",
            promo.min_order_amount.normalize()
        ));
    }

    if let Some(limit) = promo.usage_limit {
        if promo.used_count >= limit {
            return Evaluation::rejected("Promo code usage limit reached");
        }
    }

    let raw = match promo.kind {
        PromoKind::Percent => {
            let discount = order_amount * promo.value / Decimal::from(100);
            match promo.max_discount {
                Some(cap) => discount.min(cap),
                None => discount,
            }
        }
        PromoKind::Fixed => promo.value,
    };

    let discount = raw.min(order_amount).max(Decimal::ZERO).round_dp(2);
    Evaluation::applied(discount)
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePromoCodeRequest {
    #[validate(length(min = 2, max = 32, message = "Code must be between 2 and 32 characters"))]
    pub code: String,
    pub kind: PromoKind,
    pub value: Decimal,
    #[serde(default)]
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePromoCodeRequest {
    pub value: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromoCodeListResponse {
    pub promo_codes: Vec<PromoCodeModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for promo code validation, redemption, and back-office CRUD
#[derive(Clone)]
pub struct PromoCodeService {
    db: Arc<DbPool>,
}

impl PromoCodeService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Looks up an active promo code, matching case-insensitively.
    /// Codes are stored uppercase, so the input is normalized before the query.
    pub async fn find_active_by_code<C: ConnectionTrait>(
        &self,
        db: &C,
        code: &str,
    ) -> Result<Option<PromoCodeModel>, ServiceError> {
        let normalized = code.trim().to_uppercase();

        PromoCode::find()
            .filter(promo_code::Column::Code.eq(normalized))
            .filter(promo_code::Column::Active.eq(true))
            .one(db)
            .await
            .map_err(ServiceError::from)
    }

    /// Storefront validation: resolves the code and evaluates it against the
    /// order amount. Rejections come back as data, not errors; only store
    /// failures surface as `Err`.
    #[instrument(skip(self), fields(code = %code, order_amount = %order_amount))]
    pub async fn validate(
        &self,
        code: &str,
        order_amount: Decimal,
    ) -> Result<Evaluation, ServiceError> {
        let promo = self.find_active_by_code(&*self.db, code).await?;

        let evaluation = match &promo {
            Some(promo) => evaluate(promo, order_amount, Utc::now()),
            None => Evaluation::rejected("Invalid promo code"),
        };

        if !evaluation.valid {
            debug!(
                reason = evaluation.reason.as_deref().unwrap_or(""),
                "Promo code rejected"
            );
        }

        Ok(evaluation)
    }

    /// Consumes one redemption with a conditional increment, so concurrent
    /// checkouts cannot push `used_count` past `usage_limit`. Zero affected
    /// rows means the code was exhausted (or deactivated) since validation.
    pub async fn redeem<C: ConnectionTrait>(
        &self,
        db: &C,
        promo_id: Uuid,
    ) -> Result<(), ServiceError> {
        let result = PromoCode::update_many()
            .col_expr(
                promo_code::Column::UsedCount,
                Expr::col(promo_code::Column::UsedCount).add(1),
            )
            .filter(promo_code::Column::Id.eq(promo_id))
            .filter(promo_code::Column::Active.eq(true))
            .filter(
                Condition::any()
                    .add(promo_code::Column::UsageLimit.is_null())
                    .add(
                        Expr::col(promo_code::Column::UsedCount)
                            .lt(Expr::col(promo_code::Column::UsageLimit)),
                    ),
            )
            .exec(db)
            .await
            .map_err(ServiceError::from)?;

        if result.rows_affected == 0 {
            warn!(promo_code_id = %promo_id, "Redemption rejected by usage guard");
            return Err(ServiceError::Conflict(
                "Promo code usage limit reached".to_string(),
            ));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, per_page: u64) -> Result<PromoCodeListResponse, ServiceError> {
        let paginator = PromoCode::find()
            .order_by_desc(promo_code::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::from)?;
        let promo_codes = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from)?;

        Ok(PromoCodeListResponse {
            promo_codes,
            total,
            page,
            per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<PromoCodeModel>, ServiceError> {
        PromoCode::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create(
        &self,
        request: CreatePromoCodeRequest,
    ) -> Result<PromoCodeModel, ServiceError> {
        request.validate()?;
        check_magnitudes(request.kind, request.value, request.usage_limit)?;

        let code = request.code.trim().to_uppercase();
        let existing = PromoCode::find()
            .filter(promo_code::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Promo code {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let model = promo_code::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.clone()),
            kind: Set(request.kind),
            value: Set(request.value),
            min_order_amount: Set(request.min_order_amount.unwrap_or(Decimal::ZERO)),
            max_discount: Set(request.max_discount),
            usage_limit: Set(request.usage_limit),
            used_count: Set(0),
            valid_from: Set(request.valid_from.unwrap_or(now)),
            valid_to: Set(request.valid_to),
            active: Set(request.active),
            created_at: Set(now),
        };

        let created = model.insert(&*self.db).await.map_err(ServiceError::from)?;
        info!(promo_code_id = %created.id, code = %code, "Promo code created");

        Ok(created)
    }

    #[instrument(skip(self, request), fields(promo_code_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdatePromoCodeRequest,
    ) -> Result<PromoCodeModel, ServiceError> {
        let existing = PromoCode::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)?
            .ok_or_else(|| ServiceError::NotFound(format!("Promo code {} not found", id)))?;

        let kind = existing.kind;
        let value = request.value.unwrap_or(existing.value);
        let usage_limit = request.usage_limit.or(existing.usage_limit);
        check_magnitudes(kind, value, usage_limit)?;

        let mut active_model: promo_code::ActiveModel = existing.into();
        if let Some(value) = request.value {
            active_model.value = Set(value);
        }
        if let Some(min_order_amount) = request.min_order_amount {
            active_model.min_order_amount = Set(min_order_amount);
        }
        if let Some(max_discount) = request.max_discount {
            active_model.max_discount = Set(Some(max_discount));
        }
        if let Some(usage_limit) = request.usage_limit {
            active_model.usage_limit = Set(Some(usage_limit));
        }
        if let Some(valid_from) = request.valid_from {
            active_model.valid_from = Set(valid_from);
        }
        if let Some(valid_to) = request.valid_to {
            active_model.valid_to = Set(Some(valid_to));
        }
        if let Some(active) = request.active {
            active_model.active = Set(active);
        }

        let updated = active_model
            .update(&*self.db)
            .await
            .map_err(ServiceError::from)?;
        info!(promo_code_id = %id, "Promo code updated");

        Ok(updated)
    }

    #[instrument(skip(self), fields(promo_code_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = PromoCode::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::from)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Promo code {} not found",
                id
            )));
        }

        info!(promo_code_id = %id, "Promo code deleted");
        Ok(())
    }
}

fn check_magnitudes(
    kind: PromoKind,
    value: Decimal,
    usage_limit: Option<i32>,
) -> Result<(), ServiceError> {
    if value <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Discount value must be positive".to_string(),
        ));
    }
    if kind == PromoKind::Percent && value > Decimal::from(100) {
        return Err(ServiceError::ValidationError(
            "Percent discount cannot exceed 100".to_string(),
        ));
    }
    if let Some(limit) = usage_limit {
        if limit < 1 {
            return Err(ServiceError::ValidationError(
                "Usage limit must be at least 1".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn promo(kind: PromoKind, value: Decimal) -> PromoCodeModel {
        let now = Utc::now();
        PromoCodeModel {
            id: Uuid::new_v4(),
            code: "TEST".to_string(),
            kind,
            value,
            min_order_amount: Decimal::ZERO,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_to: None,
            active: true,
            created_at: now,
        }
    }

    #[test]
    fn percent_discount_clamps_to_max_discount() {
        // SAVE10: 10% over 6000 is 600, capped at 500
        let mut promo = promo(PromoKind::Percent, dec!(10));
        promo.code = "SAVE10".to_string();
        promo.min_order_amount = dec!(1000);
        promo.max_discount = Some(dec!(500));

        let result = evaluate(&promo, dec!(6000), Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount, dec!(500));
        assert_eq!(dec!(6000) - result.discount, dec!(5500));
    }

    #[test]
    fn percent_discount_without_cap() {
        let promo = promo(PromoKind::Percent, dec!(10));
        let result = evaluate(&promo, dec!(2500), Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount, dec!(250));
    }

    #[test]
    fn fixed_discount_never_exceeds_order_amount() {
        // FLAT300 against a 200 LKR order discounts the full 200
        let mut promo = promo(PromoKind::Fixed, dec!(300));
        promo.code = "FLAT300".to_string();

        let result = evaluate(&promo, dec!(200), Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount, dec!(200));
        assert_eq!(dec!(200) - result.discount, Decimal::ZERO);
    }

    #[test]
    fn fixed_discount_on_zero_amount_order() {
        let promo = promo(PromoKind::Fixed, dec!(300));
        let result = evaluate(&promo, Decimal::ZERO, Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount, Decimal::ZERO);
    }

    #[test]
    fn below_minimum_order_amount_is_rejected() {
        let mut promo = promo(PromoKind::Percent, dec!(10));
        promo.min_order_amount = dec!(1000);

        let result = evaluate(&promo, dec!(999.99), Utc::now());
        assert!(!result.valid);
        assert_eq!(result.discount, Decimal::ZERO);
        assert_eq!(
            result.reason.as_deref(),
            Some("Minimum order amount is 1000 LKR")
        );
    }

    #[test]
    fn not_yet_active_is_rejected() {
        let now = Utc::now();
        let mut promo = promo(PromoKind::Fixed, dec!(100));
        promo.valid_from = now + Duration::hours(1);

        let result = evaluate(&promo, dec!(5000), now);
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("Promo code not yet active"));
    }

    #[test]
    fn expired_is_rejected_but_boundary_instant_is_valid() {
        let now = Utc::now();
        let mut promo = promo(PromoKind::Fixed, dec!(100));
        promo.valid_to = Some(now - Duration::seconds(1));

        let result = evaluate(&promo, dec!(5000), now);
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("Promo code has expired"));

        // exactly at valid_to the code still applies
        promo.valid_to = Some(now);
        let result = evaluate(&promo, dec!(5000), now);
        assert!(result.valid);
    }

    #[test]
    fn exhausted_usage_limit_is_rejected() {
        let mut promo = promo(PromoKind::Fixed, dec!(100));
        promo.usage_limit = Some(5);
        promo.used_count = 5;

        let result = evaluate(&promo, dec!(5000), Utc::now());
        assert!(!result.valid);
        assert_eq!(
            result.reason.as_deref(),
            Some("Promo code usage limit reached")
        );
    }

    #[test]
    fn usage_limit_with_headroom_applies() {
        let mut promo = promo(PromoKind::Fixed, dec!(100));
        promo.usage_limit = Some(5);
        promo.used_count = 4;

        let result = evaluate(&promo, dec!(5000), Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount, dec!(100));
    }

    #[test]
    fn inactive_code_is_rejected() {
        let mut promo = promo(PromoKind::Percent, dec!(50));
        promo.active = false;

        let result = evaluate(&promo, dec!(5000), Utc::now());
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("Invalid promo code"));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let now = Utc::now();
        let mut promo = promo(PromoKind::Percent, dec!(15));
        promo.max_discount = Some(dec!(750));

        let first = evaluate(&promo, dec!(6000), now);
        let second = evaluate(&promo, dec!(6000), now);
        assert_eq!(first, second);
        assert_eq!(promo.used_count, 0);
    }

    #[test]
    fn discount_is_rounded_to_cents() {
        let promo = promo(PromoKind::Percent, dec!(7.5));
        // 7.5% of 1333.33 = 99.99975 -> 100.00
        let result = evaluate(&promo, dec!(1333.33), Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount, dec!(100.00));
    }

    #[test]
    fn magnitude_checks() {
        assert!(check_magnitudes(PromoKind::Percent, dec!(10), None).is_ok());
        assert!(check_magnitudes(PromoKind::Percent, dec!(101), None).is_err());
        assert!(check_magnitudes(PromoKind::Fixed, dec!(101), None).is_ok());
        assert!(check_magnitudes(PromoKind::Fixed, Decimal::ZERO, None).is_err());
        assert!(check_magnitudes(PromoKind::Fixed, dec!(10), Some(0)).is_err());
        assert!(check_magnitudes(PromoKind::Fixed, dec!(10), Some(1)).is_ok());
    }
}
