//! redb-based storage layer for carts
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `carts` | `cart_id` | `Cart` (JSON) | Cart rows with embedded items |
//! | `open_carts` | `(user_id, store_id)` | `cart_id` | Open-cart uniqueness index |
//! | `cart_items` | `item_id` | `cart_id` | Owning-cart lookup for item removal |
//!
//! The `open_carts` index enforces "at most one open (ACTIVE or ABANDONED)
//! cart per (user, store)": the existence check and the insert happen inside
//! the same write transaction, so two concurrent first-adds for the same key
//! cannot both succeed.
//!
//! # Atomicity
//!
//! Every mutating operation is a single write transaction covering both the
//! item mutation and the total recomputation. redb commits are copy-on-write
//! with an atomic pointer swap, so readers only ever observe a cart whose
//! `total_price` matches its items, and a crash mid-operation leaves the
//! store in the before state.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::pricing::calculator;
use rust_decimal::Decimal;
use shared::cart::{Cart, CartItem, CartStatus};
use shared::util::{now_millis, prefixed_id};

/// Table for cart rows: key = cart_id, value = JSON-serialized Cart
const CARTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("carts");

/// Open-cart index: key = (user_id, store_id), value = cart_id
const OPEN_CARTS_TABLE: TableDefinition<(&str, &str), &str> = TableDefinition::new("open_carts");

/// Item ownership index: key = item_id, value = cart_id
const CART_ITEMS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("cart_items");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cart not found: {0}")]
    CartNotFound(String),

    #[error("Cart item not found: {0}")]
    ItemNotFound(String),

    #[error("Product not in cart: {0}")]
    ProductNotInCart(String),

    #[error("Open cart already exists: user_id={user_id}, store_id={store_id}")]
    DuplicateOpenCart { user_id: String, store_id: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Explicit query parameters for cart scans
///
/// `idle_before` matches carts created OR last updated before the cutoff.
/// `not_status` excludes a single status (the abandonment scan excludes
/// COMPLETED).
#[derive(Debug, Clone, Default)]
pub struct CartFilter {
    pub store_id: Option<String>,
    pub status: Option<CartStatus>,
    pub not_status: Option<CartStatus>,
    pub idle_before: Option<i64>,
}

impl CartFilter {
    fn matches(&self, cart: &Cart) -> bool {
        if let Some(store_id) = &self.store_id
            && cart.store_id != *store_id
        {
            return false;
        }
        if let Some(status) = self.status
            && cart.status != status
        {
            return false;
        }
        if let Some(not_status) = self.not_status
            && cart.status == not_status
        {
            return false;
        }
        if let Some(cutoff) = self.idle_before
            && !(cart.created_at < cutoff || cart.updated_at < cutoff)
        {
            return false;
        }
        true
    }
}

/// Cart storage backed by redb
#[derive(Clone)]
pub struct CartStorage {
    db: Arc<Database>,
}

impl CartStorage {
    /// Initialize the cart tables on a shared database handle
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CARTS_TABLE)?;
            let _ = write_txn.open_table(OPEN_CARTS_TABLE)?;
            let _ = write_txn.open_table(CART_ITEMS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::new(Arc::new(db))
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::new(Arc::new(db))
    }

    // ========== Reads ==========

    /// Get a cart by id
    pub fn get(&self, cart_id: &str) -> StorageResult<Option<Cart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;
        match table.get(cart_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get the open (ACTIVE or ABANDONED) cart for a (user, store) key
    pub fn get_open(&self, user_id: &str, store_id: &str) -> StorageResult<Option<Cart>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(OPEN_CARTS_TABLE)?;
        let cart_id = match index.get((user_id, store_id))? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };
        drop(index);

        let carts = read_txn.open_table(CARTS_TABLE)?;
        match carts.get(cart_id.as_str())? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Find the owning cart of an item
    pub fn find_cart_by_item(&self, item_id: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CART_ITEMS_TABLE)?;
        Ok(table.get(item_id)?.map(|g| g.value().to_string()))
    }

    /// All open carts of a user, across stores
    pub fn open_carts_for_user(&self, user_id: &str) -> StorageResult<Vec<Cart>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(OPEN_CARTS_TABLE)?;

        // Tuple keys sort by user_id first, so the user's entries are
        // contiguous; stop at the first key belonging to another user.
        let mut cart_ids = Vec::new();
        for result in index.range((user_id, "")..)? {
            let (key, value) = result?;
            if key.value().0 != user_id {
                break;
            }
            cart_ids.push(value.value().to_string());
        }
        drop(index);

        let carts_table = read_txn.open_table(CARTS_TABLE)?;
        let mut carts = Vec::new();
        for cart_id in cart_ids {
            if let Some(guard) = carts_table.get(cart_id.as_str())? {
                carts.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(carts)
    }

    /// Scan carts matching an explicit filter
    pub fn query(&self, filter: &CartFilter) -> StorageResult<Vec<Cart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;

        let mut carts = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let cart: Cart = serde_json::from_slice(value.value())?;
            if filter.matches(&cart) {
                carts.push(cart);
            }
        }
        carts.sort_by_key(|c| c.created_at);
        Ok(carts)
    }

    // ========== Mutations ==========

    /// Create an ACTIVE cart holding its first item
    ///
    /// Fails with `DuplicateOpenCart` when the (user, store) key already has
    /// an open cart; the caller must upsert into that cart instead. The
    /// uniqueness check and the insert share one write transaction.
    pub fn create_active(
        &self,
        user_id: &str,
        store_id: &str,
        first_item: CartItem,
    ) -> StorageResult<Cart> {
        let now = now_millis();
        let cart = Cart {
            id: prefixed_id("cart"),
            user_id: user_id.to_string(),
            store_id: store_id.to_string(),
            status: CartStatus::Active,
            total_price: calculator::cart_total(std::slice::from_ref(&first_item)),
            items: vec![first_item],
            created_at: now,
            updated_at: now,
        };

        let write_txn = self.db.begin_write()?;
        {
            let mut index = write_txn.open_table(OPEN_CARTS_TABLE)?;
            if index.get((user_id, store_id))?.is_some() {
                return Err(StorageError::DuplicateOpenCart {
                    user_id: user_id.to_string(),
                    store_id: store_id.to_string(),
                });
            }
            index.insert((user_id, store_id), cart.id.as_str())?;

            let mut items_index = write_txn.open_table(CART_ITEMS_TABLE)?;
            items_index.insert(cart.items[0].id.as_str(), cart.id.as_str())?;

            let mut carts = write_txn.open_table(CARTS_TABLE)?;
            let bytes = serde_json::to_vec(&cart)?;
            carts.insert(cart.id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;

        Ok(cart)
    }

    /// Insert, overwrite or delete a line for `product_id` and recompute the
    /// cart total, all in one write transaction.
    ///
    /// - `Some(item)` with no existing line: insert it.
    /// - `Some(item)` with an existing line: full overwrite of quantity,
    ///   unit price, GST rate and display metadata; the original item id is
    ///   preserved (merge, never a duplicate row).
    /// - `None` with an existing line: delete it. An emptied cart persists.
    /// - `None` with no existing line: `ProductNotInCart`.
    ///
    /// An ABANDONED cart becomes ACTIVE again in the same transaction.
    pub fn upsert_item(
        &self,
        cart_id: &str,
        product_id: &str,
        item: Option<CartItem>,
    ) -> StorageResult<Cart> {
        let write_txn = self.db.begin_write()?;
        let cart = {
            let mut carts = write_txn.open_table(CARTS_TABLE)?;
            let mut cart = Self::load(&carts, cart_id)?;
            let mut items_index = write_txn.open_table(CART_ITEMS_TABLE)?;

            let pos = cart.items.iter().position(|i| i.product_id == product_id);
            match (item, pos) {
                (Some(new_item), Some(pos)) => {
                    let existing = &mut cart.items[pos];
                    existing.quantity = new_item.quantity;
                    existing.unit_price = new_item.unit_price;
                    existing.gst_rate = new_item.gst_rate;
                    existing.total_price = new_item.total_price;
                    existing.gst_amount = new_item.gst_amount;
                    existing.total_price_with_gst = new_item.total_price_with_gst;
                    existing.name = new_item.name;
                    existing.image = new_item.image;
                }
                (Some(new_item), None) => {
                    items_index.insert(new_item.id.as_str(), cart_id)?;
                    cart.items.push(new_item);
                }
                (None, Some(pos)) => {
                    let removed = cart.items.remove(pos);
                    items_index.remove(removed.id.as_str())?;
                }
                (None, None) => {
                    return Err(StorageError::ProductNotInCart(product_id.to_string()));
                }
            }

            if cart.status == CartStatus::Abandoned {
                cart.status = CartStatus::Active;
            }
            cart.total_price = calculator::cart_total(&cart.items);
            cart.updated_at = now_millis();

            let bytes = serde_json::to_vec(&cart)?;
            carts.insert(cart_id, bytes.as_slice())?;
            cart
        };
        write_txn.commit()?;

        Ok(cart)
    }

    /// Remove a single item by id and recompute the total
    ///
    /// Fails with `ItemNotFound` if the item is not in this cart. Never
    /// deletes the cart row itself, even when the removal empties it; the
    /// service layer decides that policy.
    pub fn remove_item(&self, cart_id: &str, item_id: &str) -> StorageResult<Cart> {
        let write_txn = self.db.begin_write()?;
        let cart = {
            let mut carts = write_txn.open_table(CARTS_TABLE)?;
            let mut cart = Self::load(&carts, cart_id)?;

            let pos = cart
                .items
                .iter()
                .position(|i| i.id == item_id)
                .ok_or_else(|| StorageError::ItemNotFound(item_id.to_string()))?;
            cart.items.remove(pos);

            let mut items_index = write_txn.open_table(CART_ITEMS_TABLE)?;
            items_index.remove(item_id)?;

            cart.total_price = calculator::cart_total(&cart.items);
            cart.updated_at = now_millis();

            let bytes = serde_json::to_vec(&cart)?;
            carts.insert(cart_id, bytes.as_slice())?;
            cart
        };
        write_txn.commit()?;

        Ok(cart)
    }

    /// Remove a single item and, when the removal empties the cart, delete
    /// the cart row and its index entries in the same write transaction.
    ///
    /// The emptiness check sees every item committed before this transaction,
    /// so a line added concurrently keeps the cart alive. The returned
    /// snapshot reflects the cart after removal; when `items` is empty the
    /// row is gone.
    pub fn remove_item_deleting_empty(&self, cart_id: &str, item_id: &str) -> StorageResult<Cart> {
        let write_txn = self.db.begin_write()?;
        let cart = {
            let mut carts = write_txn.open_table(CARTS_TABLE)?;
            let mut cart = Self::load(&carts, cart_id)?;

            let pos = cart
                .items
                .iter()
                .position(|i| i.id == item_id)
                .ok_or_else(|| StorageError::ItemNotFound(item_id.to_string()))?;
            cart.items.remove(pos);

            let mut items_index = write_txn.open_table(CART_ITEMS_TABLE)?;
            items_index.remove(item_id)?;

            cart.total_price = calculator::cart_total(&cart.items);
            cart.updated_at = now_millis();

            if cart.items.is_empty() {
                if cart.status.is_open() {
                    let mut index = write_txn.open_table(OPEN_CARTS_TABLE)?;
                    index.remove((cart.user_id.as_str(), cart.store_id.as_str()))?;
                }
                carts.remove(cart_id)?;
            } else {
                let bytes = serde_json::to_vec(&cart)?;
                carts.insert(cart_id, bytes.as_slice())?;
            }
            cart
        };
        write_txn.commit()?;

        Ok(cart)
    }

    /// Delete all items; the cart row remains with total 0
    pub fn clear(&self, cart_id: &str) -> StorageResult<Cart> {
        let write_txn = self.db.begin_write()?;
        let cart = {
            let mut carts = write_txn.open_table(CARTS_TABLE)?;
            let mut cart = Self::load(&carts, cart_id)?;

            let mut items_index = write_txn.open_table(CART_ITEMS_TABLE)?;
            for item in &cart.items {
                items_index.remove(item.id.as_str())?;
            }

            cart.items.clear();
            cart.total_price = Decimal::ZERO;
            cart.updated_at = now_millis();

            let bytes = serde_json::to_vec(&cart)?;
            carts.insert(cart_id, bytes.as_slice())?;
            cart
        };
        write_txn.commit()?;

        Ok(cart)
    }

    /// Update the status and maintain the open-cart index
    ///
    /// Leaving the open statuses removes the index entry; re-entering them
    /// re-inserts it (failing with `DuplicateOpenCart` if another open cart
    /// took the key in the meantime). The state machine itself is enforced
    /// by the service layer, not here.
    pub fn set_status(&self, cart_id: &str, status: CartStatus) -> StorageResult<Cart> {
        let write_txn = self.db.begin_write()?;
        let cart = {
            let mut carts = write_txn.open_table(CARTS_TABLE)?;
            let mut cart = Self::load(&carts, cart_id)?;

            let was_open = cart.status.is_open();
            let now_open = status.is_open();
            let mut index = write_txn.open_table(OPEN_CARTS_TABLE)?;
            if was_open && !now_open {
                index.remove((cart.user_id.as_str(), cart.store_id.as_str()))?;
            } else if !was_open && now_open {
                if index
                    .get((cart.user_id.as_str(), cart.store_id.as_str()))?
                    .is_some()
                {
                    return Err(StorageError::DuplicateOpenCart {
                        user_id: cart.user_id.clone(),
                        store_id: cart.store_id.clone(),
                    });
                }
                index.insert((cart.user_id.as_str(), cart.store_id.as_str()), cart_id)?;
            }

            cart.status = status;
            cart.updated_at = now_millis();

            let bytes = serde_json::to_vec(&cart)?;
            carts.insert(cart_id, bytes.as_slice())?;
            cart
        };
        write_txn.commit()?;

        Ok(cart)
    }

    /// Overwrite the cart total with a value computed from the item set the
    /// transaction actually commits.
    ///
    /// `adjust` receives the current cart snapshot inside the write
    /// transaction and returns the total to store; an `Err` aborts the
    /// transaction. Used for discount write-back: reading the items and
    /// writing the deducted total share one transaction, so an item mutation
    /// can never slip between them. The stored total transiently disagrees
    /// with the item sum until the next item mutation recomputes it.
    pub fn update_total_with<E, F>(&self, cart_id: &str, adjust: F) -> Result<Cart, E>
    where
        F: FnOnce(&Cart) -> Result<Decimal, E>,
        E: From<StorageError>,
    {
        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        let cart = {
            let mut carts = write_txn
                .open_table(CARTS_TABLE)
                .map_err(StorageError::from)?;
            let mut cart = Self::load(&carts, cart_id)?;

            cart.total_price = adjust(&cart)?;
            cart.updated_at = now_millis();

            let bytes = serde_json::to_vec(&cart).map_err(StorageError::from)?;
            carts
                .insert(cart_id, bytes.as_slice())
                .map_err(StorageError::from)?;
            cart
        };
        write_txn.commit().map_err(StorageError::from)?;

        Ok(cart)
    }

    fn load(
        carts: &redb::Table<'_, &'static str, &'static [u8]>,
        cart_id: &str,
    ) -> StorageResult<Cart> {
        let raw = carts
            .get(cart_id)?
            .map(|g| g.value().to_vec())
            .ok_or_else(|| StorageError::CartNotFound(cart_id.to_string()))?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
