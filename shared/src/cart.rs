//! Cart wire types
//!
//! Field names follow the storefront's existing JSON contract
//! (`totalPrice`, `totalPriceWithGST`, `gstRate`, `gstAmount`, `status`),
//! so renames are fixed here and must not drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cart lifecycle status.
///
/// ACTIVE is the shopper's working cart. ABANDONED is advisory metadata set
/// by an idle scan; the cart stays mutable and returns to ACTIVE on the next
/// item mutation. COMPLETED and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    #[default]
    Active,
    Completed,
    Abandoned,
    Cancelled,
}

impl CartStatus {
    /// Whether a cart in this status still belongs to the shopper's
    /// working set (counted by the one-open-cart-per-(user, store) rule).
    pub fn is_open(self) -> bool {
        matches!(self, CartStatus::Active | CartStatus::Abandoned)
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, CartStatus::Completed | CartStatus::Cancelled)
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CartStatus::Active => "ACTIVE",
            CartStatus::Completed => "COMPLETED",
            CartStatus::Abandoned => "ABANDONED",
            CartStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// A single cart line.
///
/// `unit_price` and `gst_rate` are captured from the catalog at add time and
/// only refreshed on an explicit update. `total_price`, `gst_amount` and
/// `total_price_with_gst` are derived by the pricing calculator and never
/// set directly by callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub gst_rate: Decimal,
    pub total_price: Decimal,
    pub gst_amount: Decimal,
    #[serde(rename = "totalPriceWithGST")]
    pub total_price_with_gst: Decimal,
    /// Denormalized display copy, not authoritative.
    #[serde(default)]
    pub name: String,
    /// Denormalized display copy, not authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A shopper's cart for one store.
///
/// `total_price` is derived: after every item mutation it equals the exact
/// sum of the items' `total_price_with_gst` values. Applying a discount
/// overwrites it transiently; the next item mutation recomputes from items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub store_id: String,
    pub status: CartStatus,
    pub total_price: Decimal,
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis
    pub updated_at: i64,
}

impl Cart {
    /// Find an item by product id (at most one exists per product).
    pub fn find_item(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Product ids currently in the cart (for discount eligibility checks).
    pub fn product_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.product_id.clone()).collect()
    }
}
