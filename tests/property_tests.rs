//! Property-based tests for the promo code evaluator.
//!
//! The evaluator is pure, so these run without a database.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_api::entities::promo_code::{Model as PromoCodeModel, PromoKind};
use storefront_api::services::promo_codes::evaluate;
use uuid::Uuid;

fn promo(kind: PromoKind, value: Decimal) -> PromoCodeModel {
    let now = Utc::now();
    PromoCodeModel {
        id: Uuid::new_v4(),
        code: "PROP".to_string(),
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

/// Order amounts as exact cents, up to 10 million LKR
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    /// discount = min(amount * v / 100, cap, amount) for percent codes
    #[test]
    fn percent_discount_matches_clamped_formula(
        amount in amount_strategy(),
        value in 0i64..=100,
        cap_cents in proptest::option::of(0i64..100_000_000),
    ) {
        let mut code = promo(PromoKind::Percent, Decimal::from(value));
        code.max_discount = cap_cents.map(|c| Decimal::new(c, 2));

        let result = evaluate(&code, amount, Utc::now());
        prop_assert!(result.valid);

        let mut expected = amount * Decimal::from(value) / Decimal::from(100);
        if let Some(cap) = code.max_discount {
            expected = expected.min(cap);
        }
        expected = expected.min(amount).round_dp(2);
        prop_assert_eq!(result.discount, expected);
    }

    /// discount = min(f, amount) for fixed codes: never negative, never more
    /// than the order amount
    #[test]
    fn fixed_discount_matches_clamped_formula(
        amount in amount_strategy(),
        value_cents in 1i64..100_000_000,
    ) {
        let code = promo(PromoKind::Fixed, Decimal::new(value_cents, 2));

        let result = evaluate(&code, amount, Utc::now());
        prop_assert!(result.valid);
        prop_assert_eq!(result.discount, Decimal::new(value_cents, 2).min(amount));
        prop_assert!(result.discount >= Decimal::ZERO);
        prop_assert!(result.discount <= amount);
    }

    /// The discounted total never goes negative
    #[test]
    fn total_never_negative(
        amount in amount_strategy(),
        value in 0i64..=100,
    ) {
        let code = promo(PromoKind::Percent, Decimal::from(value));
        let result = evaluate(&code, amount, Utc::now());
        prop_assert!(amount - result.discount >= Decimal::ZERO);
    }

    /// A code past its validity window is rejected no matter the other fields
    #[test]
    fn expired_codes_always_rejected(
        amount in amount_strategy(),
        value in 1i64..=100,
        hours_past in 1i64..10_000,
    ) {
        let now = Utc::now();
        let mut code = promo(PromoKind::Percent, Decimal::from(value));
        code.valid_to = Some(now - Duration::hours(hours_past));

        let result = evaluate(&code, amount, now);
        prop_assert!(!result.valid);
        prop_assert_eq!(result.discount, Decimal::ZERO);
    }

    /// Evaluation mutates nothing: repeated calls agree
    #[test]
    fn evaluation_is_repeatable(
        amount in amount_strategy(),
        value in 0i64..=100,
    ) {
        let now = Utc::now();
        let code = promo(PromoKind::Percent, Decimal::from(value));
        let first = evaluate(&code, amount, now);
        let second = evaluate(&code, amount, now);
        prop_assert_eq!(first, second);
    }
}
