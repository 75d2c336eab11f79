//! 统一错误处理
//!
//! 提供应用级错误类型和响应结构：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResponse`] - API 响应结构
//!
//! # 响应约定
//!
//! 所有响应使用统一信封，失败永远伴随非 2xx 状态码
//! (绝不在 200 里返回 "FAILED")：
//!
//! ```json
//! {
//!   "success": "SUCCESS",
//!   "data": { ... },
//!   "message": "Success"
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::carts::storage::StorageError;
use crate::discounts::DiscountError;
use shared::CartStatus;

/// 成功响应的 `success` 字段值
pub const SUCCESS: &str = "SUCCESS";
/// 失败响应的 `success` 字段值
pub const FAILED: &str = "FAILED";

/// API 统一响应结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppResponse<T> {
    /// "SUCCESS" 或 "FAILED"
    pub success: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// 消息
    pub message: String,
}

impl<T> AppResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: SUCCESS.to_string(),
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    /// 创建失败响应
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: FAILED.to_string(),
            data: None,
            message: message.into(),
        }
    }
}

/// 应用错误枚举
///
/// # 错误分类
///
/// | 分类 | 状态码 |
/// |------|--------|
/// | Validation / InvalidOperation / InvalidTransition | 400 |
/// | NotFound | 404 |
/// | Conflict | 409 |
/// | Discount | 400 (NotFound→404, Expired→410) |
/// | Database / Internal | 500 |
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Resource already exists: {0}")]
    /// 资源冲突 (409)
    Conflict(String),

    #[error("Invalid operation: {0}")]
    /// 当前状态下无意义的请求 (400)
    InvalidOperation(String),

    #[error("Invalid status transition: {from} -> {to}")]
    /// 非法状态变更 (400)
    InvalidTransition { from: CartStatus, to: CartStatus },

    #[error("{0}")]
    /// 折扣校验失败 (400/404/410)
    Discount(#[from] DiscountError),

    #[error("Database error: {0}")]
    /// 数据库错误 (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(_)
            | AppError::InvalidOperation(_)
            | AppError::InvalidTransition { .. } => (StatusCode::BAD_REQUEST, self.to_string()),

            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),

            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),

            AppError::Discount(e) => {
                let status = match e {
                    DiscountError::NotFound(_) => StatusCode::NOT_FOUND,
                    DiscountError::Expired(_) => StatusCode::GONE,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.to_string())
            }

            // 记录内部错误但不暴露详细信息
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }

            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(AppResponse::<()>::failed(message));
        (status, body).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::CartNotFound(id) => AppError::NotFound(format!("Cart {} not found", id)),
            StorageError::ItemNotFound(id) => {
                AppError::NotFound(format!("Cart item {} not found", id))
            }
            StorageError::ProductNotInCart(product_id) => AppError::InvalidOperation(format!(
                "cannot remove product {} - not in the cart",
                product_id
            )),
            StorageError::DuplicateOpenCart { user_id, store_id } => AppError::Conflict(format!(
                "an open cart already exists for user {} in store {}",
                user_id, store_id
            )),
            other => AppError::Database(other.to_string()),
        }
    }
}

// ========== Helper Constructors ==========

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// 处理器的 Result 类型别名
pub type AppResult<T> = std::result::Result<T, AppError>;

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse::success(data))
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<AppResponse<T>> {
    let mut resp = AppResponse::success(data);
    resp.message = message.into();
    Json(resp)
}
