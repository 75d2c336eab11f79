//! Discount API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::ServerState;
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};
use shared::discount::{Discount, DiscountCreate, DiscountUpdate};

/// GET /api/discounts - 获取所有折扣码
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<AppResponse<Vec<Discount>>>> {
    let discounts = state.discount_store().list()?;
    Ok(ok(discounts))
}

/// GET /api/discounts/:code - 获取单个折扣码
pub async fn get_by_code(
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> AppResult<Json<AppResponse<Discount>>> {
    let discount = state
        .discount_store()
        .get(&code)?
        .ok_or_else(|| AppError::not_found(format!("discount code {}", code)))?;
    Ok(ok(discount))
}

/// POST /api/discounts - 创建折扣码
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<DiscountCreate>,
) -> AppResult<Json<AppResponse<Discount>>> {
    let discount = state.discount_store().create(payload)?;
    Ok(ok(discount))
}

/// PUT /api/discounts/:code - 更新折扣码 (code 本身不可变)
pub async fn update(
    State(state): State<ServerState>,
    Path(code): Path<String>,
    Json(payload): Json<DiscountUpdate>,
) -> AppResult<Json<AppResponse<Discount>>> {
    let discount = state.discount_store().update(&code, payload)?;
    Ok(ok(discount))
}

/// DELETE /api/discounts/:code - 删除折扣码
pub async fn delete(
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> AppResult<Json<AppResponse<()>>> {
    state.discount_store().delete(&code)?;
    Ok(ok_with_message((), "Discount deleted"))
}
