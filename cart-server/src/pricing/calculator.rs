//! Line and cart total calculator
//!
//! Pure functions, no side effects:
//!
//! ```text
//! total_price          = unit_price * quantity
//! gst_amount           = round(total_price * gst_rate / 100, 2)
//! total_price_with_gst = total_price + gst_amount
//! cart total           = exact Σ of line total_price_with_gst
//! ```
//!
//! GST rounding is `MidpointAwayFromZero` at 2 decimal places, applied per
//! line only. The cart total is an exact sum of already-rounded line totals,
//! never re-rounded, so it is reproducible regardless of item ordering.

use rust_decimal::prelude::*;

use crate::utils::{AppError, AppResult};
use shared::cart::CartItem;

/// Rounding for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price per item
const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 9999;
/// Maximum allowed GST rate (percent)
const MAX_GST_RATE: Decimal = Decimal::ONE_HUNDRED;

/// Derived money fields for a single cart line
#[derive(Debug, Clone, PartialEq)]
pub struct LineTotals {
    pub total_price: Decimal,
    pub gst_amount: Decimal,
    pub total_price_with_gst: Decimal,
}

/// Validate the inputs of a line computation
///
/// Quantity, unit price and GST rate must all be positive and within sane
/// bounds. Violations abort before any computation or write.
pub fn validate_line(unit_price: Decimal, quantity: i32, gst_rate: Decimal) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::validation(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, quantity
        )));
    }
    if unit_price <= Decimal::ZERO {
        return Err(AppError::validation(format!(
            "unit price must be positive, got {}",
            unit_price
        )));
    }
    if unit_price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "unit price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, unit_price
        )));
    }
    if gst_rate <= Decimal::ZERO || gst_rate > MAX_GST_RATE {
        return Err(AppError::validation(format!(
            "GST rate must be in (0, {}], got {}",
            MAX_GST_RATE, gst_rate
        )));
    }
    Ok(())
}

/// Compute the derived money fields for one line
pub fn line_totals(unit_price: Decimal, quantity: i32, gst_rate: Decimal) -> AppResult<LineTotals> {
    validate_line(unit_price, quantity, gst_rate)?;

    let total_price = unit_price * Decimal::from(quantity);
    let gst_amount = (total_price * gst_rate / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    let total_price_with_gst = total_price + gst_amount;

    Ok(LineTotals {
        total_price,
        gst_amount,
        total_price_with_gst,
    })
}

/// Cart total: the exact sum of line `total_price_with_gst` values.
/// No re-rounding of the sum.
pub fn cart_total(items: &[CartItem]) -> Decimal {
    items.iter().map(|i| i.total_price_with_gst).sum()
}
