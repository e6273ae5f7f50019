//! # Inventory Repository
//!
//! Database operations for per-variant stock records.
//!
//! ## Concurrency
//! The decrement path is a single conditional UPDATE:
//!
//! ```text
//! UPDATE inventory SET quantity = quantity - N
//! WHERE variant_id = ?
//!   AND (allow_backorder = 1 OR quantity - reserved >= N)
//! ```
//!
//! SQLite's single-writer model makes the statement atomic, so two
//! concurrent purchases of the last unit cannot both succeed: one
//! matches the availability guard, the other fails it (`rows_affected
//! == 0`) and is reported as out of stock by the caller. A read-check
//! followed by a separate write would leave a window between the two.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::Inventory;

const INVENTORY_COLUMNS: &str = "variant_id, quantity, reserved, low_stock_threshold, \
     track_inventory, allow_backorder, updated_at";

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Inserts or replaces the stock record of a variant.
    pub async fn upsert(&self, inventory: &Inventory) -> DbResult<()> {
        debug!(variant_id = %inventory.variant_id, quantity = inventory.quantity, "Upserting inventory");

        sqlx::query(
            "INSERT INTO inventory (variant_id, quantity, reserved, low_stock_threshold,
                                    track_inventory, allow_backorder, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(variant_id) DO UPDATE SET
                 quantity = excluded.quantity,
                 reserved = excluded.reserved,
                 low_stock_threshold = excluded.low_stock_threshold,
                 track_inventory = excluded.track_inventory,
                 allow_backorder = excluded.allow_backorder,
                 updated_at = excluded.updated_at",
        )
        .bind(&inventory.variant_id)
        .bind(inventory.quantity)
        .bind(inventory.reserved)
        .bind(inventory.low_stock_threshold)
        .bind(inventory.track_inventory)
        .bind(inventory.allow_backorder)
        .bind(inventory.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches the stock record of a variant.
    pub async fn get(&self, variant_id: &str) -> DbResult<Inventory> {
        let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventory WHERE variant_id = ?1");
        sqlx::query_as::<_, Inventory>(&sql)
            .bind(variant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory", variant_id))
    }

    /// Fetches the stock record if one exists. Untracked variants may
    /// legitimately have none.
    pub async fn find(&self, variant_id: &str) -> DbResult<Option<Inventory>> {
        let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventory WHERE variant_id = ?1");
        let inventory = sqlx::query_as::<_, Inventory>(&sql)
            .bind(variant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(inventory)
    }

    /// Decrements on-hand quantity iff availability (or backorder
    /// permission) covers the request, in one statement. Returns `true`
    /// when the decrement happened, `false` when the guard failed.
    ///
    /// Callers must only invoke this for tracked inventory; the guard
    /// includes `track_inventory = 1` as a belt check.
    pub async fn decrease_checked(
        &self,
        variant_id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE inventory SET quantity = quantity - ?2, updated_at = ?3
             WHERE variant_id = ?1
               AND track_inventory = 1
               AND (allow_backorder = 1 OR quantity - reserved >= ?2)",
        )
        .bind(variant_id)
        .bind(amount)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Increments on-hand quantity (restock, cancellation).
    pub async fn increase(&self, variant_id: &str, amount: i64, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE inventory SET quantity = quantity + ?2, updated_at = ?3 WHERE variant_id = ?1",
        )
        .bind(variant_id)
        .bind(amount)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory", variant_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bazaar_core::{Product, ProductVariant};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_variant(db: &Database) -> String {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: "Tee".to_string(),
            description: None,
            is_active: true,
            publish_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_product(&product).await.unwrap();

        let variant = ProductVariant {
            id: Uuid::new_v4().to_string(),
            product_id: product.id,
            sku: format!("SKU-{}", Uuid::new_v4()),
            name: "Tee".to_string(),
            is_default: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_variant(&variant).await.unwrap();
        variant.id
    }

    fn stock(variant_id: &str, quantity: i64, reserved: i64, allow_backorder: bool) -> Inventory {
        Inventory {
            variant_id: variant_id.to_string(),
            quantity,
            reserved,
            low_stock_threshold: 10,
            track_inventory: true,
            allow_backorder,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_decrease_respects_reserved() {
        let db = test_db().await;
        let variant_id = seed_variant(&db).await;
        let repo = db.inventory();

        // 5 on hand, 3 reserved: only 2 sellable.
        repo.upsert(&stock(&variant_id, 5, 3, false)).await.unwrap();

        assert!(!repo.decrease_checked(&variant_id, 3, Utc::now()).await.unwrap());
        assert!(repo.decrease_checked(&variant_id, 2, Utc::now()).await.unwrap());
        assert_eq!(repo.get(&variant_id).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_backorder_allows_negative_quantity() {
        let db = test_db().await;
        let variant_id = seed_variant(&db).await;
        let repo = db.inventory();

        repo.upsert(&stock(&variant_id, 1, 0, true)).await.unwrap();

        assert!(repo.decrease_checked(&variant_id, 5, Utc::now()).await.unwrap());
        assert_eq!(repo.get(&variant_id).await.unwrap().quantity, -4);
    }

    #[tokio::test]
    async fn test_untracked_guard_rejects() {
        let db = test_db().await;
        let variant_id = seed_variant(&db).await;
        let repo = db.inventory();

        let mut inv = stock(&variant_id, 100, 0, false);
        inv.track_inventory = false;
        repo.upsert(&inv).await.unwrap();

        // Callers skip the decrement for untracked stock; the SQL guard
        // refuses it outright even if one slips through.
        assert!(!repo.decrease_checked(&variant_id, 1, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_increase_restocks() {
        let db = test_db().await;
        let variant_id = seed_variant(&db).await;
        let repo = db.inventory();

        repo.upsert(&stock(&variant_id, 2, 0, false)).await.unwrap();
        repo.increase(&variant_id, 8, Utc::now()).await.unwrap();
        assert_eq!(repo.get(&variant_id).await.unwrap().quantity, 10);
    }
}
