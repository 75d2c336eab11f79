//! 购物车业务服务
//!
//! 组合存储层、商品目录与折扣引擎, 实现购物车的完整业务规则:
//!
//! - 单价与 GST 税率以目录为准, 客户端覆盖价仅为兼容保留并记录警告
//! - 首次加购创建 ACTIVE 购物车, 之后按 product_id 合并覆盖
//! - 移除最后一个条目时删除购物车 (数量归零路径则保留空车)
//! - 折扣为一次性写回, 任何后续条目变更都会重算并丢弃折扣
//! - COMPLETED / CANCELLED 为终态, 不允许再转移

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::carts::storage::{CartFilter, CartStorage, StorageError};
use crate::catalog::CatalogLookup;
use crate::discounts::{DiscountError, DiscountStore, engine};
use crate::pricing::calculator;
use crate::utils::{AppError, AppResult};
use shared::cart::{Cart, CartItem, CartStatus};
use shared::discount::DiscountSummary;
use shared::util::{now_millis, prefixed_id};

/// Cart business service
#[derive(Clone)]
pub struct CartService {
    storage: CartStorage,
    discounts: DiscountStore,
    catalog: Arc<dyn CatalogLookup>,
}

impl CartService {
    pub fn new(
        storage: CartStorage,
        discounts: DiscountStore,
        catalog: Arc<dyn CatalogLookup>,
    ) -> Self {
        Self {
            storage,
            discounts,
            catalog,
        }
    }

    /// Add a product or overwrite its existing line.
    ///
    /// Creates the cart on first add. Quantity ≤ 0 removes the line from the
    /// open cart (`InvalidOperation` when there is none); the emptied cart is
    /// kept. Price and GST rate come from the catalog; `price_override` is
    /// honored for wire compatibility but logged as a warning.
    pub fn add_or_update_item(
        &self,
        user_id: &str,
        store_id: &str,
        product_id: &str,
        quantity: i32,
        price_override: Option<Decimal>,
    ) -> AppResult<Cart> {
        if quantity <= 0 {
            let cart = self.storage.get_open(user_id, store_id)?.ok_or_else(|| {
                AppError::invalid_operation(format!(
                    "cannot remove product {} - no open cart for user {} at store {}",
                    product_id, user_id, store_id
                ))
            })?;
            let cart = self.storage.upsert_item(&cart.id, product_id, None)?;
            tracing::info!(cart_id = %cart.id, product_id = %product_id, "Item removed via zero quantity");
            return Ok(cart);
        }

        let product = self
            .catalog
            .get_product(product_id)
            .ok_or_else(|| AppError::not_found(format!("product {}", product_id)))?;
        let unit_price = match price_override {
            Some(price) => {
                tracing::warn!(
                    product_id = %product_id,
                    catalog_price = %product.unit_price,
                    override_price = %price,
                    "Client-supplied price override accepted"
                );
                price
            }
            None => product.unit_price,
        };

        let totals = calculator::line_totals(unit_price, quantity, product.gst_rate)?;
        let item = CartItem {
            id: prefixed_id("item"),
            product_id: product_id.to_string(),
            quantity,
            unit_price,
            gst_rate: product.gst_rate,
            total_price: totals.total_price,
            gst_amount: totals.gst_amount,
            total_price_with_gst: totals.total_price_with_gst,
            name: product.name,
            image: product.image,
        };

        match self.storage.get_open(user_id, store_id)? {
            Some(cart) => Ok(self.storage.upsert_item(&cart.id, product_id, Some(item))?),
            None => match self.storage.create_active(user_id, store_id, item.clone()) {
                Ok(cart) => {
                    tracing::info!(
                        cart_id = %cart.id,
                        user_id = %user_id,
                        store_id = %store_id,
                        "Cart created"
                    );
                    Ok(cart)
                }
                // Lost a first-add race; merge into the winner instead.
                Err(StorageError::DuplicateOpenCart { .. }) => {
                    let cart = self.storage.get_open(user_id, store_id)?.ok_or_else(|| {
                        AppError::internal("open cart disappeared during concurrent create")
                    })?;
                    Ok(self.storage.upsert_item(&cart.id, product_id, Some(item))?)
                }
                Err(e) => Err(e.into()),
            },
        }
    }

    /// The open cart for a (user, store) key
    pub fn get_active_cart(&self, user_id: &str, store_id: &str) -> AppResult<Cart> {
        self.storage.get_open(user_id, store_id)?.ok_or_else(|| {
            AppError::not_found(format!(
                "open cart for user {} at store {}",
                user_id, store_id
            ))
        })
    }

    /// Remove one item by its id; deletes the cart when the removal empties it
    pub fn remove_item(&self, item_id: &str) -> AppResult<Cart> {
        let cart_id = self
            .storage
            .find_cart_by_item(item_id)?
            .ok_or_else(|| AppError::not_found(format!("cart item {}", item_id)))?;

        // Removal and the empty-cart delete share one write transaction, so
        // a line added concurrently can never be wiped out with the cart.
        let cart = self.storage.remove_item_deleting_empty(&cart_id, item_id)?;
        if cart.items.is_empty() {
            tracing::info!(cart_id = %cart.id, "Last item removed, cart deleted");
        }
        Ok(cart)
    }

    /// Empty every open cart of the user, across all stores
    pub fn clear_cart(&self, user_id: &str) -> AppResult<Vec<Cart>> {
        let open = self.storage.open_carts_for_user(user_id)?;
        if open.is_empty() {
            return Err(AppError::not_found(format!(
                "open carts for user {}",
                user_id
            )));
        }

        let mut cleared = Vec::with_capacity(open.len());
        for cart in open {
            cleared.push(self.storage.clear(&cart.id)?);
        }
        tracing::info!(user_id = %user_id, carts = cleared.len(), "Carts cleared");
        Ok(cleared)
    }

    /// Validate a discount code against the open cart and write the
    /// discounted total back.
    ///
    /// The write-back is transient: the next item mutation recomputes the
    /// total from item sums and drops the discount. `usage_count` is the
    /// caller's count of prior redemptions by this customer.
    pub fn apply_discount(
        &self,
        user_id: &str,
        store_id: &str,
        code: &str,
        usage_count: u32,
    ) -> AppResult<(Cart, DiscountSummary)> {
        let cart = self.storage.get_open(user_id, store_id)?.ok_or_else(|| {
            AppError::not_found(format!(
                "open cart for user {} at store {}",
                user_id, store_id
            ))
        })?;

        let discount = self
            .discounts
            .get(code)?
            .ok_or_else(|| DiscountError::NotFound(code.to_string()))?;

        // Eligibility and the discount math run inside the write transaction
        // against the item set it commits; total_price may still carry a
        // previous write-back, so the subtotal is always the item sum.
        let mut applied = (Decimal::ZERO, Decimal::ZERO);
        let updated = self
            .storage
            .update_total_with(&cart.id, |current: &Cart| -> AppResult<Decimal> {
                let subtotal = calculator::cart_total(&current.items);
                engine::check_eligibility(
                    &discount,
                    &current.store_id,
                    subtotal,
                    &current.product_ids(),
                    usage_count,
                    now_millis(),
                )?;
                let amount = engine::compute_amount(&discount, subtotal);
                applied = (subtotal, amount);
                Ok(subtotal - amount)
            })?;
        let (subtotal, amount) = applied;
        tracing::info!(cart_id = %updated.id, code = %code, amount = %amount, "Discount applied");

        let summary = DiscountSummary {
            code: discount.code,
            discount_type: discount.discount_type,
            value: discount.value,
            amount,
            original_total: subtotal,
            discounted_total: subtotal - amount,
        };
        Ok((updated, summary))
    }

    /// Transition a cart's status
    ///
    /// ACTIVE and ABANDONED may move to any other status; COMPLETED and
    /// CANCELLED are terminal. Setting the current status again is a no-op.
    pub fn set_status(&self, cart_id: &str, status: CartStatus) -> AppResult<Cart> {
        let cart = self
            .storage
            .get(cart_id)?
            .ok_or_else(|| AppError::not_found(format!("cart {}", cart_id)))?;

        if cart.status == status {
            return Ok(cart);
        }
        if cart.status.is_terminal() {
            return Err(AppError::InvalidTransition {
                from: cart.status,
                to: status,
            });
        }

        let updated = self.storage.set_status(cart_id, status)?;
        tracing::info!(cart_id = %cart_id, from = %cart.status, to = %status, "Cart status changed");
        Ok(updated)
    }

    /// ACTIVE carts of a store
    pub fn list_active(&self, store_id: &str) -> AppResult<Vec<Cart>> {
        Ok(self.storage.query(&CartFilter {
            store_id: Some(store_id.to_string()),
            status: Some(CartStatus::Active),
            ..Default::default()
        })?)
    }

    /// Read-only abandonment scan: non-COMPLETED carts of the store idle
    /// for longer than `idle_hours`.
    pub fn list_abandoned(&self, store_id: &str, idle_hours: i64) -> AppResult<Vec<Cart>> {
        let cutoff = now_millis() - idle_hours * 3_600_000;
        Ok(self.storage.query(&CartFilter {
            store_id: Some(store_id.to_string()),
            status: None,
            not_status: Some(CartStatus::Completed),
            idle_before: Some(cutoff),
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogProduct, StaticCatalog};
    use rust_decimal::prelude::*;
    use shared::discount::{DiscountCreate, DiscountType};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    fn test_service() -> CartService {
        let storage = CartStorage::open_in_memory().unwrap();
        let discounts = DiscountStore::open_in_memory().unwrap();
        let catalog = StaticCatalog::new();
        catalog.insert(CatalogProduct {
            product_id: "p1".into(),
            name: "Coffee".into(),
            image: None,
            unit_price: dec("10.00"),
            gst_rate: dec("10"),
        });
        catalog.insert(CatalogProduct {
            product_id: "p2".into(),
            name: "Tea".into(),
            image: Some("tea.png".into()),
            unit_price: dec("4.50"),
            gst_rate: dec("10"),
        });
        CartService::new(storage, discounts, Arc::new(catalog))
    }

    fn percentage_discount(code: &str, value: &str) -> DiscountCreate {
        DiscountCreate {
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            value: dec(value),
            store_id: None,
            min_order_amount: None,
            max_discount_amount: None,
            expiry_date: now_millis() + 86_400_000,
            active: None,
            limited: None,
            customer_usage_limit: None,
            include: None,
            exclude: None,
        }
    }

    #[test]
    fn first_add_creates_cart_with_gst_totals() {
        let service = test_service();
        let cart = service
            .add_or_update_item("u1", "s1", "p1", 3, None)
            .unwrap();

        assert_eq!(cart.status, CartStatus::Active);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].total_price_with_gst, dec("33.00"));
        assert_eq!(cart.total_price, dec("33.00"));
        assert_eq!(cart.items[0].name, "Coffee");
    }

    #[test]
    fn re_adding_a_product_overwrites_the_line() {
        let service = test_service();
        let first = service
            .add_or_update_item("u1", "s1", "p1", 3, None)
            .unwrap();
        let item_id = first.items[0].id.clone();

        let cart = service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].id, item_id);
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(cart.total_price, dec("11.00"));
    }

    #[test]
    fn unknown_product_is_not_found() {
        let service = test_service();
        let err = service
            .add_or_update_item("u1", "s1", "ghost", 1, None)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn price_override_is_honored() {
        let service = test_service();
        let cart = service
            .add_or_update_item("u1", "s1", "p1", 1, Some(dec("2.00")))
            .unwrap();
        assert_eq!(cart.items[0].unit_price, dec("2.00"));
        assert_eq!(cart.total_price, dec("2.20"));
    }

    #[test]
    fn zero_quantity_without_open_cart_is_invalid() {
        let service = test_service();
        let err = service
            .add_or_update_item("u1", "s1", "p1", 0, None)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[test]
    fn zero_quantity_removes_line_but_keeps_cart() {
        let service = test_service();
        service
            .add_or_update_item("u1", "s1", "p1", 2, None)
            .unwrap();
        let cart = service
            .add_or_update_item("u1", "s1", "p1", 0, None)
            .unwrap();

        assert!(cart.items.is_empty());
        assert_eq!(cart.total_price, Decimal::ZERO);
        // the empty cart is still the open cart
        let open = service.get_active_cart("u1", "s1").unwrap();
        assert_eq!(open.id, cart.id);
    }

    #[test]
    fn removing_the_last_item_deletes_the_cart() {
        let service = test_service();
        let cart = service
            .add_or_update_item("u1", "s1", "p1", 2, None)
            .unwrap();
        let item_id = cart.items[0].id.clone();

        let snapshot = service.remove_item(&item_id).unwrap();
        assert!(snapshot.items.is_empty());

        let err = service.get_active_cart("u1", "s1").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn removing_one_of_two_items_keeps_the_cart() {
        let service = test_service();
        let cart = service
            .add_or_update_item("u1", "s1", "p1", 2, None)
            .unwrap();
        service
            .add_or_update_item("u1", "s1", "p2", 1, None)
            .unwrap();
        let first_item = cart.items[0].id.clone();

        let cart = service.remove_item(&first_item).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, "p2");
        assert_eq!(cart.total_price, dec("4.95"));
    }

    #[test]
    fn remove_unknown_item_is_not_found() {
        let service = test_service();
        let err = service.remove_item("item_ghost").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn clear_cart_spans_all_stores() {
        let service = test_service();
        service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();
        service
            .add_or_update_item("u1", "s2", "p2", 2, None)
            .unwrap();

        let cleared = service.clear_cart("u1").unwrap();
        assert_eq!(cleared.len(), 2);
        for cart in &cleared {
            assert!(cart.items.is_empty());
            assert_eq!(cart.total_price, Decimal::ZERO);
        }
        // cleared carts remain open
        assert!(service.get_active_cart("u1", "s1").is_ok());
    }

    #[test]
    fn clear_cart_without_open_carts_is_not_found() {
        let service = test_service();
        let err = service.clear_cart("u1").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn apply_discount_writes_total_back() {
        let service = test_service();
        service
            .add_or_update_item("u1", "s1", "p1", 3, None)
            .unwrap();
        service
            .discounts
            .create(percentage_discount("SAVE10", "10"))
            .unwrap();

        let (cart, summary) = service.apply_discount("u1", "s1", "SAVE10", 0).unwrap();
        // 10% of 33.00 = 3.30
        assert_eq!(summary.amount, dec("3.30"));
        assert_eq!(summary.original_total, dec("33.00"));
        assert_eq!(summary.discounted_total, dec("29.70"));
        assert_eq!(cart.total_price, dec("29.70"));
    }

    #[test]
    fn next_mutation_drops_the_discount() {
        let service = test_service();
        service
            .add_or_update_item("u1", "s1", "p1", 3, None)
            .unwrap();
        service
            .discounts
            .create(percentage_discount("SAVE10", "10"))
            .unwrap();
        service.apply_discount("u1", "s1", "SAVE10", 0).unwrap();

        let cart = service
            .add_or_update_item("u1", "s1", "p2", 1, None)
            .unwrap();
        // 33.00 + 4.95, discount gone
        assert_eq!(cart.total_price, dec("37.95"));
    }

    #[test]
    fn excluded_product_blocks_the_discount() {
        let service = test_service();
        service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();

        let mut payload = percentage_discount("NOCOFFEE", "10");
        payload.exclude = Some(vec!["p1".into()]);
        service.discounts.create(payload).unwrap();

        let err = service
            .apply_discount("u1", "s1", "NOCOFFEE", 0)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Discount(DiscountError::ExcludedProductPresent(_))
        ));
    }

    #[test]
    fn unknown_code_is_discount_not_found() {
        let service = test_service();
        service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();
        let err = service.apply_discount("u1", "s1", "GHOST", 0).unwrap_err();
        assert!(matches!(err, AppError::Discount(DiscountError::NotFound(_))));
    }

    #[test]
    fn terminal_statuses_reject_transitions() {
        let service = test_service();
        let cart = service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();

        service.set_status(&cart.id, CartStatus::Completed).unwrap();
        let err = service
            .set_status(&cart.id, CartStatus::Active)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                from: CartStatus::Completed,
                ..
            }
        ));
        // same-status set is a no-op, not an error
        assert!(service.set_status(&cart.id, CartStatus::Completed).is_ok());
    }

    #[test]
    fn completing_a_cart_frees_the_open_slot() {
        let service = test_service();
        let first = service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();
        service
            .set_status(&first.id, CartStatus::Completed)
            .unwrap();

        let second = service
            .add_or_update_item("u1", "s1", "p1", 2, None)
            .unwrap();
        assert_ne!(second.id, first.id);
    }

    #[test]
    fn abandoned_cart_reactivates_on_item_mutation() {
        let service = test_service();
        let cart = service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();
        service.set_status(&cart.id, CartStatus::Abandoned).unwrap();

        let cart = service
            .add_or_update_item("u1", "s1", "p2", 1, None)
            .unwrap();
        assert_eq!(cart.status, CartStatus::Active);
    }

    #[test]
    fn abandonment_scan_excludes_completed() {
        let service = test_service();
        let keep = service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();
        let done = service
            .add_or_update_item("u2", "s1", "p1", 1, None)
            .unwrap();
        service.set_status(&done.id, CartStatus::Completed).unwrap();
        service
            .add_or_update_item("u3", "other", "p1", 1, None)
            .unwrap();

        // cutoff in the future so freshly created carts qualify as idle
        let idle = service.list_abandoned("s1", -1).unwrap();
        let ids: Vec<&str> = idle.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![keep.id.as_str()]);
    }

    #[test]
    fn abandonment_scan_respects_the_idle_window() {
        let service = test_service();
        service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();

        // 24h cutoff: a cart created just now is not idle
        let idle = service.list_abandoned("s1", 24).unwrap();
        assert!(idle.is_empty());
    }

    #[test]
    fn list_active_is_store_scoped() {
        let service = test_service();
        service
            .add_or_update_item("u1", "s1", "p1", 1, None)
            .unwrap();
        let abandoned = service
            .add_or_update_item("u2", "s1", "p1", 1, None)
            .unwrap();
        service
            .set_status(&abandoned.id, CartStatus::Abandoned)
            .unwrap();
        service
            .add_or_update_item("u3", "s2", "p1", 1, None)
            .unwrap();

        let active = service.list_active("s1").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, "u1");
    }
}
