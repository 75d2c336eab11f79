//! redb-based discount code store
//!
//! Single table `discounts` keyed by code (globally unique, case-sensitive,
//! even across stores). Updates mutate in place; codes are not versioned.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

use crate::carts::storage::StorageResult;
use crate::utils::{AppError, AppResult};
use shared::discount::{Discount, DiscountCreate, DiscountUpdate};
use shared::util::now_millis;

/// Table for discounts: key = code, value = JSON-serialized Discount
const DISCOUNTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("discounts");

/// Discount storage backed by redb
#[derive(Clone)]
pub struct DiscountStore {
    db: Arc<Database>,
}

impl DiscountStore {
    /// Initialize the discount table on a shared database handle
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DISCOUNTS_TABLE)?;
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

    /// Create a discount
    ///
    /// Fails with `Conflict` if the code exists; `Validation` if `limited`
    /// is set without a positive `customer_usage_limit`, or a percentage
    /// value is outside (0, 100].
    pub fn create(&self, payload: DiscountCreate) -> AppResult<Discount> {
        validate_value(payload.discount_type, payload.value)?;
        let limited = payload.limited.unwrap_or(false);
        if limited && payload.customer_usage_limit.unwrap_or(0) == 0 {
            return Err(AppError::validation(
                "limited discounts require a positive customerUsageLimit",
            ));
        }

        let now = now_millis();
        let discount = Discount {
            code: payload.code,
            discount_type: payload.discount_type,
            value: payload.value,
            store_id: payload.store_id,
            min_order_amount: payload.min_order_amount,
            max_discount_amount: payload.max_discount_amount,
            expiry_date: payload.expiry_date,
            active: payload.active.unwrap_or(true),
            limited,
            customer_usage_limit: payload.customer_usage_limit,
            include: payload.include.unwrap_or_default(),
            exclude: payload.exclude.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let inserted = self.insert_new(&discount).map_err(AppError::from)?;
        if !inserted {
            return Err(AppError::conflict(format!(
                "discount code {} already exists",
                discount.code
            )));
        }

        tracing::info!(code = %discount.code, "Discount created");
        Ok(discount)
    }

    /// Update a discount in place (the code itself is immutable)
    pub fn update(&self, code: &str, payload: DiscountUpdate) -> AppResult<Discount> {
        let mut discount = self
            .get(code)?
            .ok_or_else(|| AppError::not_found(format!("discount code {}", code)))?;

        if let Some(t) = payload.discount_type {
            discount.discount_type = t;
        }
        if let Some(v) = payload.value {
            discount.value = v;
        }
        if let Some(s) = payload.store_id {
            discount.store_id = s;
        }
        if let Some(m) = payload.min_order_amount {
            discount.min_order_amount = m;
        }
        if let Some(m) = payload.max_discount_amount {
            discount.max_discount_amount = m;
        }
        if let Some(e) = payload.expiry_date {
            discount.expiry_date = e;
        }
        if let Some(a) = payload.active {
            discount.active = a;
        }
        if let Some(l) = payload.limited {
            discount.limited = l;
        }
        if let Some(c) = payload.customer_usage_limit {
            discount.customer_usage_limit = c;
        }
        if let Some(i) = payload.include {
            discount.include = i;
        }
        if let Some(e) = payload.exclude {
            discount.exclude = e;
        }

        validate_value(discount.discount_type, discount.value)?;
        if discount.limited && discount.customer_usage_limit.unwrap_or(0) == 0 {
            return Err(AppError::validation(
                "limited discounts require a positive customerUsageLimit",
            ));
        }
        discount.updated_at = now_millis();

        self.put(&discount).map_err(AppError::from)?;
        tracing::info!(code = %discount.code, "Discount updated");
        Ok(discount)
    }

    /// Delete by code
    pub fn delete(&self, code: &str) -> AppResult<()> {
        let removed = self.remove(code).map_err(AppError::from)?;
        if !removed {
            return Err(AppError::not_found(format!("discount code {}", code)));
        }
        tracing::info!(code = %code, "Discount deleted");
        Ok(())
    }

    /// Get by code
    pub fn get(&self, code: &str) -> AppResult<Option<Discount>> {
        self.fetch(code).map_err(AppError::from)
    }

    /// List all discounts
    pub fn list(&self) -> AppResult<Vec<Discount>> {
        self.scan().map_err(AppError::from)
    }

    // ========== redb plumbing ==========

    /// Insert only if the code is absent; the existence check and the
    /// insert share one write transaction.
    fn insert_new(&self, discount: &Discount) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(DISCOUNTS_TABLE)?;
            if table.get(discount.code.as_str())?.is_some() {
                false
            } else {
                let bytes = serde_json::to_vec(discount)?;
                table.insert(discount.code.as_str(), bytes.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(inserted)
    }

    fn put(&self, discount: &Discount) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DISCOUNTS_TABLE)?;
            let bytes = serde_json::to_vec(discount)?;
            table.insert(discount.code.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, code: &str) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(DISCOUNTS_TABLE)?;
            table.remove(code)?.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn fetch(&self, code: &str) -> StorageResult<Option<Discount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DISCOUNTS_TABLE)?;
        match table.get(code)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn scan(&self) -> StorageResult<Vec<Discount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DISCOUNTS_TABLE)?;
        let mut discounts = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            discounts.push(serde_json::from_slice(value.value())?);
        }
        Ok(discounts)
    }
}

fn validate_value(
    discount_type: shared::discount::DiscountType,
    value: rust_decimal::Decimal,
) -> AppResult<()> {
    use rust_decimal::Decimal;
    use shared::discount::DiscountType;

    if value <= Decimal::ZERO {
        return Err(AppError::validation(format!(
            "discount value must be positive, got {}",
            value
        )));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(AppError::validation(format!(
            "percentage discount value must be at most 100, got {}",
            value
        )));
    }
    Ok(())
}
