//! Shared types for the storefront cart platform
//!
//! Wire-facing domain types consumed by the cart server and any future
//! client crates: cart and discount entities, status enums, and utility
//! functions (timestamps, resource ID generation).

pub mod cart;
pub mod discount;
pub mod util;

// Re-exports
pub use cart::{Cart, CartItem, CartStatus};
pub use discount::{Discount, DiscountSummary, DiscountType};
pub use serde::{Deserialize, Serialize};
