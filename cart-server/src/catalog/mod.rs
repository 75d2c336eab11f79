//! 商品目录
//!
//! 购物车条目的单价与 GST 税率来自这里, 而不是客户端请求。
//! `StaticCatalog` 从工作目录下的 catalog.json 加载, 文件不存在时为空目录。

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Product as the pricing layer sees it: identity, display fields, and the
/// authoritative unit price / GST rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub unit_price: Decimal,
    /// GST percentage, e.g. 10 = 10%
    pub gst_rate: Decimal,
}

/// Product lookup seam between the cart service and whatever owns the
/// product data.
pub trait CatalogLookup: Send + Sync {
    fn get_product(&self, product_id: &str) -> Option<CatalogProduct>;
}

/// In-memory catalog keyed by product id
#[derive(Default)]
pub struct StaticCatalog {
    products: RwLock<HashMap<String, CatalogProduct>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文件加载目录 (格式: CatalogProduct 数组)
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let products: Vec<CatalogProduct> = serde_json::from_str(&content)?;
        let catalog = Self::new();
        for product in products {
            catalog.insert(product);
        }
        Ok(catalog)
    }

    pub fn insert(&self, product: CatalogProduct) {
        self.products
            .write()
            .insert(product.product_id.clone(), product);
    }

    pub fn len(&self) -> usize {
        self.products.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }
}

impl CatalogLookup for StaticCatalog {
    fn get_product(&self, product_id: &str) -> Option<CatalogProduct> {
        self.products.read().get(product_id).cloned()
    }
}
