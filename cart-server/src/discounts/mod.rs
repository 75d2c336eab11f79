//! 折扣模块 - 折扣码存储与资格/金额引擎
//!
//! - [`store`] - redb CRUD (按 code 键)
//! - [`engine`] - 纯资格校验与金额计算

pub mod engine;
pub mod store;

pub use engine::{DiscountError, check_eligibility, compute_amount};
pub use store::DiscountStore;
