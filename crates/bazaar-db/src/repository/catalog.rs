//! # Catalog Repository
//!
//! Database operations for products, variants, attribute values and prices.
//!
//! ## Entity Relationships
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                                                                      │
//! │   products 1 ──── n product_variants 1 ──── n prices                 │
//! │                        │                                             │
//! │                        n                                             │
//! │              variant_attribute_values                                │
//! │                        n                                             │
//! │                        │                                             │
//! │               attribute_values          (shared, owned by none)      │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules that span rows (exactly-one-default, name derivation, combination
//! uniqueness) live in the catalog service; this layer only moves rows.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::{AttributeValue, Price, Product, ProductVariant};

const PRODUCT_COLUMNS: &str =
    "id, name, description, is_active, publish_at, created_at, updated_at";

const VARIANT_COLUMNS: &str =
    "id, product_id, sku, name, is_default, is_active, created_at, updated_at";

const PRICE_COLUMNS: &str = "id, variant_id, currency, is_default_currency, \
     base_cents, sale_cents, sale_start, sale_end";

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Inserts a new product.
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            "INSERT INTO products (id, name, description, is_active, publish_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.is_active)
        .bind(product.publish_at)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a product by ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Product> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Inserts a new variant.
    pub async fn insert_variant(&self, variant: &ProductVariant) -> DbResult<()> {
        debug!(id = %variant.id, sku = %variant.sku, "Inserting variant");

        sqlx::query(
            "INSERT INTO product_variants (id, product_id, sku, name, is_default, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.sku)
        .bind(&variant.name)
        .bind(variant.is_default)
        .bind(variant.is_active)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a variant by ID.
    pub async fn get_variant(&self, id: &str) -> DbResult<ProductVariant> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = ?1");
        sqlx::query_as::<_, ProductVariant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("ProductVariant", id))
    }

    /// Fetches a variant by SKU.
    pub async fn find_variant_by_sku(&self, sku: &str) -> DbResult<Option<ProductVariant>> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE sku = ?1");
        let variant = sqlx::query_as::<_, ProductVariant>(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(variant)
    }

    /// Lists a product's variants in creation order. Default promotion
    /// picks "the first active variant" out of exactly this ordering.
    pub async fn list_variants(&self, product_id: &str) -> DbResult<Vec<ProductVariant>> {
        let sql = format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants \
             WHERE product_id = ?1 ORDER BY created_at ASC, id ASC"
        );
        let variants = sqlx::query_as::<_, ProductVariant>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(variants)
    }

    /// Updates a variant's mutable fields (name, active flag).
    pub async fn update_variant(
        &self,
        id: &str,
        name: &str,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE product_variants SET name = ?2, is_active = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(name)
        .bind(is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProductVariant", id));
        }

        Ok(())
    }

    /// Deletes a variant. Prices, links and inventory cascade.
    pub async fn delete_variant(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting variant");

        let result = sqlx::query("DELETE FROM product_variants WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProductVariant", id));
        }

        Ok(())
    }

    /// Clears the default flag on every variant of a product. Paired with
    /// [`set_default`](Self::set_default) by the catalog service; both are
    /// direct column writes so default maintenance never re-enters the
    /// variant update path.
    pub async fn clear_default(&self, product_id: &str, now: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            "UPDATE product_variants SET is_default = 0, updated_at = ?2 \
             WHERE product_id = ?1 AND is_default = 1",
        )
        .bind(product_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Flags one variant as the product's default.
    pub async fn set_default(&self, variant_id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE product_variants SET is_default = 1, updated_at = ?2 WHERE id = ?1",
        )
        .bind(variant_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProductVariant", variant_id));
        }

        Ok(())
    }

    // =========================================================================
    // Attribute values
    // =========================================================================

    /// Fetches or creates the shared row for an (attribute, value) pair.
    pub async fn upsert_attribute_value(
        &self,
        id: &str,
        attribute: &str,
        value: &str,
    ) -> DbResult<AttributeValue> {
        // ON CONFLICT DO NOTHING keeps the existing row and its id.
        sqlx::query(
            "INSERT INTO attribute_values (id, attribute, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(attribute, value) DO NOTHING",
        )
        .bind(id)
        .bind(attribute)
        .bind(value)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, AttributeValue>(
            "SELECT id, attribute, value FROM attribute_values WHERE attribute = ?1 AND value = ?2",
        )
        .bind(attribute)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Links an attribute value to a variant. Idempotent.
    pub async fn link_attribute_value(
        &self,
        variant_id: &str,
        attribute_value_id: &str,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO variant_attribute_values (variant_id, attribute_value_id)
             VALUES (?1, ?2) ON CONFLICT DO NOTHING",
        )
        .bind(variant_id)
        .bind(attribute_value_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes every attribute link of a variant (before re-assigning).
    pub async fn unlink_attribute_values(&self, variant_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM variant_attribute_values WHERE variant_id = ?1")
            .bind(variant_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// The attribute values linked to one variant, sorted by attribute name.
    pub async fn values_for_variant(&self, variant_id: &str) -> DbResult<Vec<AttributeValue>> {
        let values = sqlx::query_as::<_, AttributeValue>(
            "SELECT av.id, av.attribute, av.value
             FROM attribute_values av
             JOIN variant_attribute_values vav ON vav.attribute_value_id = av.id
             WHERE vav.variant_id = ?1
             ORDER BY av.attribute ASC",
        )
        .bind(variant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(values)
    }

    // =========================================================================
    // Prices
    // =========================================================================

    /// Inserts or replaces the price row for a (variant, currency) pair.
    pub async fn upsert_price(&self, price: &Price) -> DbResult<()> {
        debug!(variant_id = %price.variant_id, currency = %price.currency, "Upserting price");

        sqlx::query(
            "INSERT INTO prices (id, variant_id, currency, is_default_currency,
                                 base_cents, sale_cents, sale_start, sale_end)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(variant_id, currency) DO UPDATE SET
                 is_default_currency = excluded.is_default_currency,
                 base_cents = excluded.base_cents,
                 sale_cents = excluded.sale_cents,
                 sale_start = excluded.sale_start,
                 sale_end = excluded.sale_end",
        )
        .bind(&price.id)
        .bind(&price.variant_id)
        .bind(&price.currency)
        .bind(price.is_default_currency)
        .bind(price.base_cents)
        .bind(price.sale_cents)
        .bind(price.sale_start)
        .bind(price.sale_end)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All price rows of a variant, default currency first.
    pub async fn prices_for_variant(&self, variant_id: &str) -> DbResult<Vec<Price>> {
        let sql = format!(
            "SELECT {PRICE_COLUMNS} FROM prices WHERE variant_id = ?1 \
             ORDER BY is_default_currency DESC, currency ASC"
        );
        let prices = sqlx::query_as::<_, Price>(&sql)
            .bind(variant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(prices)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn product(name: &str) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            is_active: true,
            publish_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn variant(product_id: &str, sku: &str, offset_secs: i64) -> ProductVariant {
        let now = Utc::now() + Duration::seconds(offset_secs);
        ProductVariant {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            sku: sku.to_string(),
            name: sku.to_string(),
            is_default: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_variants_in_creation_order() {
        let db = test_db().await;
        let repo = db.catalog();

        let p = product("Tee");
        repo.insert_product(&p).await.unwrap();
        repo.insert_variant(&variant(&p.id, "TEE-S", -20)).await.unwrap();
        repo.insert_variant(&variant(&p.id, "TEE-M", -10)).await.unwrap();
        repo.insert_variant(&variant(&p.id, "TEE-L", 0)).await.unwrap();

        let listed = repo.list_variants(&p.id).await.unwrap();
        let skus: Vec<&str> = listed.iter().map(|v| v.sku.as_str()).collect();
        assert_eq!(skus, vec!["TEE-S", "TEE-M", "TEE-L"]);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = test_db().await;
        let repo = db.catalog();

        let p = product("Tee");
        repo.insert_product(&p).await.unwrap();
        repo.insert_variant(&variant(&p.id, "TEE-S", 0)).await.unwrap();

        let err = repo
            .insert_variant(&variant(&p.id, "TEE-S", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_default_flag_swap() {
        let db = test_db().await;
        let repo = db.catalog();

        let p = product("Tee");
        repo.insert_product(&p).await.unwrap();
        let a = variant(&p.id, "TEE-S", -10);
        let b = variant(&p.id, "TEE-M", 0);
        repo.insert_variant(&a).await.unwrap();
        repo.insert_variant(&b).await.unwrap();
        repo.set_default(&a.id, Utc::now()).await.unwrap();

        repo.clear_default(&p.id, Utc::now()).await.unwrap();
        repo.set_default(&b.id, Utc::now()).await.unwrap();

        let listed = repo.list_variants(&p.id).await.unwrap();
        let defaults: Vec<&str> = listed
            .iter()
            .filter(|v| v.is_default)
            .map(|v| v.sku.as_str())
            .collect();
        assert_eq!(defaults, vec!["TEE-M"]);
    }

    #[tokio::test]
    async fn test_attribute_value_upsert_is_shared() {
        let db = test_db().await;
        let repo = db.catalog();

        let first = repo
            .upsert_attribute_value(&Uuid::new_v4().to_string(), "color", "navy")
            .await
            .unwrap();
        let second = repo
            .upsert_attribute_value(&Uuid::new_v4().to_string(), "color", "navy")
            .await
            .unwrap();
        assert_eq!(first.id, second.id, "second upsert must reuse the row");
    }

    #[tokio::test]
    async fn test_values_for_variant_sorted_by_attribute() {
        let db = test_db().await;
        let repo = db.catalog();

        let p = product("Tee");
        repo.insert_product(&p).await.unwrap();
        let v = variant(&p.id, "TEE-S", 0);
        repo.insert_variant(&v).await.unwrap();

        let size = repo
            .upsert_attribute_value(&Uuid::new_v4().to_string(), "size", "S")
            .await
            .unwrap();
        let color = repo
            .upsert_attribute_value(&Uuid::new_v4().to_string(), "color", "navy")
            .await
            .unwrap();
        repo.link_attribute_value(&v.id, &size.id).await.unwrap();
        repo.link_attribute_value(&v.id, &color.id).await.unwrap();

        let values = repo.values_for_variant(&v.id).await.unwrap();
        let attrs: Vec<&str> = values.iter().map(|av| av.attribute.as_str()).collect();
        assert_eq!(attrs, vec!["color", "size"]);
    }

    #[tokio::test]
    async fn test_price_upsert_replaces_existing_row() {
        let db = test_db().await;
        let repo = db.catalog();

        let p = product("Tee");
        repo.insert_product(&p).await.unwrap();
        let v = variant(&p.id, "TEE-S", 0);
        repo.insert_variant(&v).await.unwrap();

        let mut price = Price {
            id: Uuid::new_v4().to_string(),
            variant_id: v.id.clone(),
            currency: "USD".to_string(),
            is_default_currency: true,
            base_cents: 10_000,
            sale_cents: None,
            sale_start: None,
            sale_end: None,
        };
        repo.upsert_price(&price).await.unwrap();

        price.base_cents = 12_000;
        price.sale_cents = Some(8_000);
        repo.upsert_price(&price).await.unwrap();

        let prices = repo.prices_for_variant(&v.id).await.unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].base_cents, 12_000);
        assert_eq!(prices[0].sale_cents, Some(8_000));
    }
}
