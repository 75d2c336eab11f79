//! Cart API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok, ok_with_message};
use shared::cart::{Cart, CartStatus};
use shared::discount::DiscountSummary;

/// 加购 / 改量请求体
///
/// `price` 为兼容保留的客户端覆盖价, 正常请求不应携带。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: i32,
    pub price: Option<Decimal>,
}

/// 应用折扣码请求体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDiscountRequest {
    pub code: String,
    /// 该顾客已使用此折扣码的次数 (由调用方统计)
    pub usage_count: Option<u32>,
}

/// 状态流转请求体
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: CartStatus,
}

/// 闲置扫描查询参数
#[derive(Debug, Deserialize)]
pub struct AbandonedQuery {
    /// 闲置阈值 (小时), 缺省使用 ABANDONED_AFTER_HOURS 配置
    pub hours: Option<i64>,
}

/// 折扣应用响应: 折后购物车 + 折扣摘要
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountedCart {
    pub cart: Cart,
    pub discount: DiscountSummary,
}

/// GET /api/stores/:store_id/cart/:user_id - 当前打开的购物车
pub async fn get_cart(
    State(state): State<ServerState>,
    Path((store_id, user_id)): Path<(String, String)>,
) -> AppResult<Json<AppResponse<Cart>>> {
    let cart = state.cart_service().get_active_cart(&user_id, &store_id)?;
    Ok(ok(cart))
}

/// POST /api/stores/:store_id/cart/:user_id/items - 加购或改量
pub async fn add_item(
    State(state): State<ServerState>,
    Path((store_id, user_id)): Path<(String, String)>,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<Json<AppResponse<Cart>>> {
    let cart = state.cart_service().add_or_update_item(
        &user_id,
        &store_id,
        &payload.product_id,
        payload.quantity,
        payload.price,
    )?;
    Ok(ok(cart))
}

/// POST /api/stores/:store_id/cart/:user_id/discount - 应用折扣码
pub async fn apply_discount(
    State(state): State<ServerState>,
    Path((store_id, user_id)): Path<(String, String)>,
    Json(payload): Json<ApplyDiscountRequest>,
) -> AppResult<Json<AppResponse<DiscountedCart>>> {
    let (cart, discount) = state.cart_service().apply_discount(
        &user_id,
        &store_id,
        &payload.code,
        payload.usage_count.unwrap_or(0),
    )?;
    Ok(ok(DiscountedCart { cart, discount }))
}

/// DELETE /api/cart/items/:item_id - 按条目 id 移除
pub async fn remove_item(
    State(state): State<ServerState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<AppResponse<Cart>>> {
    let cart = state.cart_service().remove_item(&item_id)?;
    Ok(ok(cart))
}

/// DELETE /api/cart/:user_id - 清空用户的全部购物车 (跨店铺)
pub async fn clear_cart(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<AppResponse<Vec<Cart>>>> {
    let carts = state.cart_service().clear_cart(&user_id)?;
    Ok(ok_with_message(carts, "Carts cleared"))
}

/// PUT /api/carts/:cart_id/status - 状态流转
pub async fn set_status(
    State(state): State<ServerState>,
    Path(cart_id): Path<String>,
    Json(payload): Json<SetStatusRequest>,
) -> AppResult<Json<AppResponse<Cart>>> {
    let cart = state.cart_service().set_status(&cart_id, payload.status)?;
    Ok(ok(cart))
}

/// GET /api/stores/:store_id/carts/active - 店铺的 ACTIVE 购物车
pub async fn list_active(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
) -> AppResult<Json<AppResponse<Vec<Cart>>>> {
    let carts = state.cart_service().list_active(&store_id)?;
    Ok(ok(carts))
}

/// GET /api/stores/:store_id/carts/abandoned?hours= - 闲置扫描
pub async fn list_abandoned(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
    Query(query): Query<AbandonedQuery>,
) -> AppResult<Json<AppResponse<Vec<Cart>>>> {
    let hours = query.hours.unwrap_or(state.config.abandoned_after_hours);
    let carts = state.cart_service().list_abandoned(&store_id, hours)?;
    Ok(ok(carts))
}
