//! Cart Server - 多租户商城的购物车与折扣计价引擎
//!
//! # 架构概述
//!
//! 本服务持有购物者的活动购物车，在每次变更后重新计算行项与购物车总价
//! (含 GST)，并对促销折扣码执行资格校验与金额计算。
//!
//! # 模块结构
//!
//! ```text
//! cart-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── pricing/       # 纯计价函数 (行总计、GST、购物车总计)
//! ├── carts/         # redb 存储 + 购物车服务编排
//! ├── discounts/     # 折扣码存储 + 资格/金额引擎
//! ├── catalog/       # 商品目录查询边界
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod carts;
pub mod catalog;
pub mod core;
pub mod discounts;
pub mod pricing;
pub mod utils;

// Re-export 公共类型
pub use carts::{CartService, CartStorage};
pub use catalog::{CatalogLookup, CatalogProduct, StaticCatalog};
pub use core::{Config, Server, ServerState};
pub use discounts::{DiscountError, DiscountStore};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

pub fn print_banner() {
    println!(
        r#"
   ______           __
  / ____/___ ______/ /_
 / /   / __ `/ ___/ __/
/ /___/ /_/ / /  / /_
\____/\__,_/_/   \__/
   _____
  / ___/___  ______   _____  _____
  \__ \/ _ \/ ___/ | / / _ \/ ___/
 ___/ /  __/ /   | |/ /  __/ /
/____/\___/_/    |___/\___/_/
    "#
    );
}
