//! Cart API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/stores/{store_id}/cart/{user_id} | GET | 当前打开的购物车 |
//! | /api/stores/{store_id}/cart/{user_id}/items | POST | 加购 / 改量 (合并覆盖) |
//! | /api/stores/{store_id}/cart/{user_id}/discount | POST | 应用折扣码 |
//! | /api/cart/items/{item_id} | DELETE | 按条目 id 移除 |
//! | /api/cart/{user_id} | DELETE | 清空用户的全部购物车 |
//! | /api/carts/{cart_id}/status | PUT | 状态流转 |
//! | /api/stores/{store_id}/carts/active | GET | 店铺的 ACTIVE 购物车 |
//! | /api/stores/{store_id}/carts/abandoned | GET | 闲置扫描 (?hours=) |

mod handler;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/stores/{store_id}/cart/{user_id}",
            get(handler::get_cart),
        )
        .route(
            "/api/stores/{store_id}/cart/{user_id}/items",
            post(handler::add_item),
        )
        .route(
            "/api/stores/{store_id}/cart/{user_id}/discount",
            post(handler::apply_discount),
        )
        .route("/api/cart/items/{item_id}", delete(handler::remove_item))
        .route("/api/cart/{user_id}", delete(handler::clear_cart))
        .route("/api/carts/{cart_id}/status", put(handler::set_status))
        .route(
            "/api/stores/{store_id}/carts/active",
            get(handler::list_active),
        )
        .route(
            "/api/stores/{store_id}/carts/abandoned",
            get(handler::list_abandoned),
        )
}
