//! 购物车模块 - 存储与服务编排
//!
//! - [`storage`] - redb 持久化层 (原子变更 + 总价重算)
//! - [`service`] - 业务编排 (状态机、目录解析、折扣应用)

pub mod service;
pub mod storage;

pub use service::CartService;
pub use storage::{CartFilter, CartStorage, StorageError, StorageResult};
