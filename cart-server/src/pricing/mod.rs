//! 计价模块 - 行项与购物车总价的纯计算
//!
//! 所有金额使用 rust_decimal 精确计算，GST 按行四舍五入 (远离零)。

pub mod calculator;

pub use calculator::{LineTotals, cart_total, line_totals};
