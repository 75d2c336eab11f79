//! Discount eligibility and amount engine
//!
//! Pure functions over a `Discount` and a cart observation. Checks run in a
//! fixed order and short-circuit, so tests can assert exactly which rule
//! fires for a crafted fixture:
//!
//! Inactive → Expired → StoreMismatch → BelowMinimum → IncludeNotMet →
//! ExcludedProductPresent → UsageLimitReached
//!
//! Usage tracking is an external collaborator concern; the engine only
//! compares the caller-supplied count against the cap.

use rust_decimal::prelude::*;
use thiserror::Error;

use shared::discount::{Discount, DiscountType};

const DECIMAL_PLACES: u32 = 2;

/// Eligibility failures, one per check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountError {
    #[error("Discount code not found: {0}")]
    NotFound(String),

    #[error("Discount code {0} is not active")]
    Inactive(String),

    #[error("Discount code {0} has expired")]
    Expired(String),

    #[error("Discount code {0} is not valid for this store")]
    StoreMismatch(String),

    #[error("Cart total {actual} is below the minimum order amount {required}")]
    BelowMinimum { required: Decimal, actual: Decimal },

    #[error("Cart does not contain any product eligible for code {0}")]
    IncludeNotMet(String),

    #[error("Cart contains a product excluded from code {0}")]
    ExcludedProductPresent(String),

    #[error("Usage limit reached for discount code {0}")]
    UsageLimitReached(String),
}

/// Run the eligibility checks for a cart observation
///
/// `subtotal` is the cart total the discount would apply to, `product_ids`
/// the product ids currently in the cart, `usage_count` how many times this
/// customer has already redeemed the code, and `now` the evaluation instant
/// (Unix millis).
pub fn check_eligibility(
    discount: &Discount,
    store_id: &str,
    subtotal: Decimal,
    product_ids: &[String],
    usage_count: u32,
    now: i64,
) -> Result<(), DiscountError> {
    if !discount.active {
        return Err(DiscountError::Inactive(discount.code.clone()));
    }

    if discount.expiry_date < now {
        return Err(DiscountError::Expired(discount.code.clone()));
    }

    // Global codes (store_id = None) are valid everywhere
    if let Some(required_store) = &discount.store_id
        && required_store != store_id
    {
        return Err(DiscountError::StoreMismatch(discount.code.clone()));
    }

    if let Some(min) = discount.min_order_amount
        && subtotal < min
    {
        return Err(DiscountError::BelowMinimum {
            required: min,
            actual: subtotal,
        });
    }

    if !discount.include.is_empty()
        && !product_ids.iter().any(|p| discount.include.contains(p))
    {
        return Err(DiscountError::IncludeNotMet(discount.code.clone()));
    }

    if !discount.exclude.is_empty()
        && product_ids.iter().any(|p| discount.exclude.contains(p))
    {
        return Err(DiscountError::ExcludedProductPresent(discount.code.clone()));
    }

    if discount.limited {
        // create() guarantees a positive cap when limited is set
        let cap = discount.customer_usage_limit.unwrap_or(0);
        if usage_count >= cap {
            return Err(DiscountError::UsageLimitReached(discount.code.clone()));
        }
    }

    Ok(())
}

/// Compute the discount amount for a subtotal
///
/// Percentage amounts are rounded to 2 decimal places (half away from
/// zero). The result is clamped first by `max_discount_amount`, then by the
/// subtotal itself: a discount can never make the cart negative.
pub fn compute_amount(discount: &Discount, subtotal: Decimal) -> Decimal {
    let mut amount = match discount.discount_type {
        DiscountType::Percentage => (subtotal * discount.value / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero),
        DiscountType::Fixed => discount.value,
    };

    if let Some(max) = discount.max_discount_amount {
        amount = amount.min(max);
    }
    amount.min(subtotal).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::util::now_millis;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn fixture(code: &str) -> Discount {
        Discount {
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            value: dec("10"),
            store_id: None,
            min_order_amount: None,
            max_discount_amount: None,
            expiry_date: now_millis() + 86_400_000,
            active: true,
            limited: false,
            customer_usage_limit: None,
            include: vec![],
            exclude: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn passes_all_checks_for_plain_code() {
        let d = fixture("SAVE10");
        let r = check_eligibility(&d, "s1", dec("100"), &ids(&["sku1"]), 0, now_millis());
        assert!(r.is_ok());
    }

    #[test]
    fn inactive_fires_before_expired() {
        let mut d = fixture("SAVE10");
        d.active = false;
        d.expiry_date = 0;
        let err = check_eligibility(&d, "s1", dec("100"), &[], 0, now_millis()).unwrap_err();
        assert_eq!(err, DiscountError::Inactive("SAVE10".into()));
    }

    #[test]
    fn expired_code_is_rejected() {
        let mut d = fixture("SAVE10");
        d.expiry_date = now_millis() - 1000;
        let err = check_eligibility(&d, "s1", dec("100"), &[], 0, now_millis()).unwrap_err();
        assert_eq!(err, DiscountError::Expired("SAVE10".into()));
    }

    #[test]
    fn store_scoped_code_rejects_other_stores() {
        let mut d = fixture("SAVE10");
        d.store_id = Some("s1".into());
        assert!(check_eligibility(&d, "s1", dec("100"), &[], 0, now_millis()).is_ok());
        let err = check_eligibility(&d, "s2", dec("100"), &[], 0, now_millis()).unwrap_err();
        assert_eq!(err, DiscountError::StoreMismatch("SAVE10".into()));
    }

    #[test]
    fn below_minimum_reports_both_amounts() {
        let mut d = fixture("SAVE10");
        d.min_order_amount = Some(dec("50"));
        let err = check_eligibility(&d, "s1", dec("49.99"), &[], 0, now_millis()).unwrap_err();
        assert_eq!(
            err,
            DiscountError::BelowMinimum {
                required: dec("50"),
                actual: dec("49.99"),
            }
        );
    }

    #[test]
    fn include_requires_at_least_one_match() {
        let mut d = fixture("SAVE10");
        d.include = ids(&["sku9"]);
        let err =
            check_eligibility(&d, "s1", dec("100"), &ids(&["sku1", "sku2"]), 0, now_millis())
                .unwrap_err();
        assert_eq!(err, DiscountError::IncludeNotMet("SAVE10".into()));

        assert!(
            check_eligibility(&d, "s1", dec("100"), &ids(&["sku9", "sku2"]), 0, now_millis())
                .is_ok()
        );
    }

    #[test]
    fn excluded_product_rejects_the_cart() {
        let mut d = fixture("SAVE10");
        d.exclude = ids(&["sku1"]);
        let err = check_eligibility(&d, "s1", dec("100"), &ids(&["sku1"]), 0, now_millis())
            .unwrap_err();
        assert_eq!(err, DiscountError::ExcludedProductPresent("SAVE10".into()));
    }

    #[test]
    fn usage_limit_compares_caller_count() {
        let mut d = fixture("SAVE10");
        d.limited = true;
        d.customer_usage_limit = Some(2);
        assert!(check_eligibility(&d, "s1", dec("100"), &[], 1, now_millis()).is_ok());
        let err = check_eligibility(&d, "s1", dec("100"), &[], 2, now_millis()).unwrap_err();
        assert_eq!(err, DiscountError::UsageLimitReached("SAVE10".into()));
    }

    #[test]
    fn percentage_amount_clamped_by_max() {
        let mut d = fixture("SAVE50");
        d.value = dec("50");
        d.max_discount_amount = Some(dec("20"));
        assert_eq!(compute_amount(&d, dec("100")), dec("20"));
    }

    #[test]
    fn fixed_amount_clamped_to_subtotal() {
        let mut d = fixture("TAKE50");
        d.discount_type = DiscountType::Fixed;
        d.value = dec("50");
        assert_eq!(compute_amount(&d, dec("10")), dec("10"));
    }

    #[test]
    fn max_clamp_applies_before_subtotal_clamp() {
        let mut d = fixture("TAKE50");
        d.discount_type = DiscountType::Fixed;
        d.value = dec("50");
        d.max_discount_amount = Some(dec("30"));
        // max clamps 50 -> 30, subtotal clamps 30 -> 25
        assert_eq!(compute_amount(&d, dec("25")), dec("25"));
    }

    #[test]
    fn percentage_amount_is_rounded_to_cents() {
        let mut d = fixture("SAVE15");
        d.value = dec("15");
        // 15% of 33.33 = 4.9995 -> 5.00
        assert_eq!(compute_amount(&d, dec("33.33")), dec("5.00"));
    }
}
