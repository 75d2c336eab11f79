//! Discount model
//!
//! A discount is identified by its `code` (globally unique, case-sensitive).
//! `store_id = None` means the code is redeemable at any store.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Discount type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `value` is a percentage of the cart total (30 = 30%).
    Percentage,
    /// `value` is a currency amount taken off the cart total.
    Fixed,
}

/// Discount entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    /// Restrict redemption to one store; `None` = global.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    /// Minimum cart total required before the code applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Decimal>,
    /// Upper bound on the computed discount amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<Decimal>,
    /// Expiry datetime (Unix millis); the code is usable through this instant.
    pub expiry_date: i64,
    pub active: bool,
    /// Whether per-customer usage is capped. When true,
    /// `customer_usage_limit` must be a positive number.
    #[serde(default)]
    pub limited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_usage_limit: Option<u32>,
    /// At least one of these product ids must be in the cart
    /// (empty = no requirement).
    #[serde(default)]
    pub include: Vec<String>,
    /// Product ids whose presence disqualifies the cart.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis
    pub updated_at: i64,
}

/// Create discount payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCreate {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub store_id: Option<String>,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub expiry_date: i64,
    pub active: Option<bool>,
    pub limited: Option<bool>,
    pub customer_usage_limit: Option<u32>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

/// Update discount payload (code itself is immutable)
///
/// Nullable fields use a double `Option`: an absent key is `None` (leave
/// unchanged), an explicit JSON `null` is `Some(None)` (clear the field),
/// and a value is `Some(Some(v))`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountUpdate {
    pub discount_type: Option<DiscountType>,
    pub value: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub store_id: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_order_amount: Option<Option<Decimal>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_discount_amount: Option<Option<Decimal>>,
    pub expiry_date: Option<i64>,
    pub active: Option<bool>,
    pub limited: Option<bool>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_usage_limit: Option<Option<u32>>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

/// Deserialize a present-but-nullable field: the derive alone folds JSON
/// `null` into the outer `None`, losing the distinction from an absent key.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Outcome of a successful discount application, returned alongside the
/// re-priced cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSummary {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    /// Amount actually taken off after clamping.
    pub amount: Decimal,
    pub original_total: Decimal,
    pub discounted_total: Decimal,
}
