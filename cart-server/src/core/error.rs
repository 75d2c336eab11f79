use thiserror::Error;

use crate::carts::storage::StorageError;

/// 服务器级错误 (启动/关闭阶段)
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

/// 启动流程的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
