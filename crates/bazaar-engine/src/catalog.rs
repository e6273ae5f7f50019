//! # Catalog Service
//!
//! Orchestrates variants, attribute values, pricing and inventory on top
//! of the repositories, applying the cross-row rules that live in
//! `bazaar-core`.
//!
//! ## Default-Variant Maintenance
//! ```text
//! create / update / delete variant
//!      │
//!      ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ ensure_default(product):                                    │
//! │   active variants exist, none default → promote the first   │
//! │   active one in creation order                              │
//! │   no active variants → clear any stale default flag         │
//! │                                                             │
//! │ Promotion writes the flag columns directly (clear_default / │
//! │ set_default); it never re-enters the variant update path,   │
//! │ so maintenance cannot recurse.                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock
//! The decrement delegates to the repository's single conditional
//! UPDATE; this layer only translates a refused decrement into
//! [`CatalogError::OutOfStock`] with the numbers a storefront needs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use bazaar_core::pricing::{quote, PriceQuote};
use bazaar_core::validation::validate_sku;
use bazaar_core::variant::{
    configurable_options, derive_variant_name, matches_selection, pick_default,
    should_derive_name,
};
use bazaar_core::{
    AttributeValue, CatalogConfig, CatalogError, Inventory, Price, Product, ProductVariant,
};
use bazaar_db::{Database, DbError};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Inputs
// =============================================================================

/// Input for creating a variant.
#[derive(Debug, Clone)]
pub struct NewVariant {
    pub product_id: String,

    /// Business identifier, unique across all products.
    pub sku: String,

    /// Explicit display name. When absent the name is derived from the
    /// attribute values (or falls back to the SKU).
    pub name: Option<String>,

    /// (attribute, value) pairs, e.g. `[("color", "Navy"), ("size", "L")]`.
    pub attributes: Vec<(String, String)>,

    /// Request the default slot explicitly. Independent of this flag, the
    /// first active variant of a product always becomes default.
    pub is_default: bool,
}

// =============================================================================
// Service
// =============================================================================

/// Catalog orchestration service.
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
    config: CatalogConfig,
}

impl CatalogService {
    /// Creates a new catalog service.
    pub fn new(db: Database, config: CatalogConfig) -> Self {
        CatalogService { db, config }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product. `publish_at` in the future (or None) keeps it
    /// unpublished regardless of the active flag.
    pub async fn create_product(
        &self,
        name: &str,
        description: Option<&str>,
        publish_at: Option<DateTime<Utc>>,
    ) -> EngineResult<Product> {
        if name.trim().is_empty() {
            return Err(bazaar_core::ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            description: description.map(str::to_string),
            is_active: true,
            publish_at,
            created_at: now,
            updated_at: now,
        };
        self.db.catalog().insert_product(&product).await?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Fetches a product.
    pub async fn get_product(&self, id: &str) -> EngineResult<Product> {
        self.db
            .catalog()
            .get_product(id)
            .await
            .map_err(|e| not_found_as(e, CatalogError::ProductNotFound(id.to_string())))
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Creates a variant with its attribute values, derives its display
    /// name, and maintains the product's default slot.
    pub async fn create_variant(&self, input: NewVariant) -> EngineResult<ProductVariant> {
        validate_sku(&input.sku)?;
        // Fails early when the product doesn't exist.
        self.get_product(&input.product_id).await?;

        let catalog = self.db.catalog();
        let now = Utc::now();

        let variant = ProductVariant {
            id: Uuid::new_v4().to_string(),
            product_id: input.product_id.clone(),
            sku: input.sku.clone(),
            // SKU as placeholder; re-derived below once values are linked.
            name: input.name.clone().unwrap_or_else(|| input.sku.clone()),
            is_default: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        catalog.insert_variant(&variant).await?;

        for (attribute, value) in &input.attributes {
            let row = catalog
                .upsert_attribute_value(&Uuid::new_v4().to_string(), attribute, value)
                .await?;
            catalog.link_attribute_value(&variant.id, &row.id).await?;
        }

        if input.name.is_none() && !input.attributes.is_empty() {
            let values = catalog.values_for_variant(&variant.id).await?;
            catalog
                .update_variant(&variant.id, &derive_variant_name(&values), true, now)
                .await?;
        }

        if input.is_default {
            catalog.clear_default(&input.product_id, now).await?;
            catalog.set_default(&variant.id, now).await?;
        } else {
            self.ensure_default(&input.product_id).await?;
        }

        let created = catalog.get_variant(&variant.id).await?;
        info!(id = %created.id, sku = %created.sku, name = %created.name, "Variant created");
        Ok(created)
    }

    /// Fetches a variant.
    pub async fn get_variant(&self, id: &str) -> EngineResult<ProductVariant> {
        self.db
            .catalog()
            .get_variant(id)
            .await
            .map_err(|e| not_found_as(e, CatalogError::VariantNotFound(id.to_string())))
    }

    /// Updates a variant's name and/or active flag.
    ///
    /// `name: None` re-derives the display name from the attribute values
    /// when no caller-set name exists. Deactivating (or activating) a
    /// variant re-runs default maintenance for the product.
    pub async fn update_variant(
        &self,
        id: &str,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> EngineResult<ProductVariant> {
        let variant = self.get_variant(id).await?;
        let catalog = self.db.catalog();
        let now = Utc::now();

        let new_active = is_active.unwrap_or(variant.is_active);
        let new_name = match name {
            Some(explicit) => explicit.to_string(),
            None if should_derive_name(&variant) => {
                let values = catalog.values_for_variant(id).await?;
                if values.is_empty() {
                    variant.sku.clone()
                } else {
                    derive_variant_name(&values)
                }
            }
            None => variant.name.clone(),
        };

        catalog.update_variant(id, &new_name, new_active, now).await?;

        if new_active != variant.is_active {
            if variant.is_default && !new_active {
                // A disabled variant cannot stay default.
                catalog.clear_default(&variant.product_id, now).await?;
            }
            self.ensure_default(&variant.product_id).await?;
        }

        self.get_variant(id).await
    }

    /// Replaces a variant's attribute values and re-derives its name when
    /// the caller never set one.
    pub async fn set_attributes(
        &self,
        variant_id: &str,
        attributes: &[(String, String)],
    ) -> EngineResult<ProductVariant> {
        let variant = self.get_variant(variant_id).await?;
        let catalog = self.db.catalog();

        catalog.unlink_attribute_values(variant_id).await?;
        for (attribute, value) in attributes {
            let row = catalog
                .upsert_attribute_value(&Uuid::new_v4().to_string(), attribute, value)
                .await?;
            catalog.link_attribute_value(variant_id, &row.id).await?;
        }

        if should_derive_name(&variant) && !attributes.is_empty() {
            let values = catalog.values_for_variant(variant_id).await?;
            catalog
                .update_variant(
                    variant_id,
                    &derive_variant_name(&values),
                    variant.is_active,
                    Utc::now(),
                )
                .await?;
        }

        self.get_variant(variant_id).await
    }

    /// Deletes a variant; the default slot moves to the next active
    /// variant in creation order when the default was deleted.
    pub async fn delete_variant(&self, id: &str) -> EngineResult<()> {
        let variant = self.get_variant(id).await?;
        self.db.catalog().delete_variant(id).await?;
        debug!(id = %id, sku = %variant.sku, "Variant deleted");

        if variant.is_default {
            self.ensure_default(&variant.product_id).await?;
        }
        Ok(())
    }

    /// Restores the default-variant rule for one product: whenever at
    /// least one active variant exists, exactly one of them is default.
    async fn ensure_default(&self, product_id: &str) -> EngineResult<()> {
        let catalog = self.db.catalog();
        let variants = catalog.list_variants(product_id).await?;
        let now = Utc::now();

        let has_valid_default = variants.iter().any(|v| v.is_default && v.is_active);
        if has_valid_default {
            return Ok(());
        }

        catalog.clear_default(product_id, now).await?;
        if let Some(promoted) = pick_default(&variants) {
            catalog.set_default(&promoted.id, now).await?;
            info!(
                product_id = %product_id,
                variant_id = %promoted.id,
                sku = %promoted.sku,
                "Promoted default variant"
            );
        }
        Ok(())
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Maps attribute name → distinct values across a product's active
    /// variants, for "pick your configuration" UI.
    pub async fn configurable_options(
        &self,
        product_id: &str,
    ) -> EngineResult<BTreeMap<String, std::collections::BTreeSet<String>>> {
        self.get_product(product_id).await?;
        let catalog = self.db.catalog();

        let mut value_sets = Vec::new();
        for variant in catalog.list_variants(product_id).await? {
            if variant.is_active {
                value_sets.push(catalog.values_for_variant(&variant.id).await?);
            }
        }
        Ok(configurable_options(&value_sets))
    }

    /// Resolves a submitted selection to the single active variant whose
    /// attribute set matches it exactly.
    pub async fn resolve_variant(
        &self,
        product_id: &str,
        selection: &BTreeMap<String, String>,
    ) -> EngineResult<ProductVariant> {
        self.get_product(product_id).await?;
        let catalog = self.db.catalog();

        for variant in catalog.list_variants(product_id).await? {
            if !variant.is_active {
                continue;
            }
            let values = catalog.values_for_variant(&variant.id).await?;
            if matches_selection(&values, selection) {
                return Ok(variant);
            }
        }

        Err(CatalogError::InvalidAttributeCombination {
            product_id: product_id.to_string(),
        }
        .into())
    }

    /// The attribute values linked to a variant.
    pub async fn variant_attributes(&self, variant_id: &str) -> EngineResult<Vec<AttributeValue>> {
        self.get_variant(variant_id).await?;
        Ok(self.db.catalog().values_for_variant(variant_id).await?)
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Sets (or replaces) the price row for a (variant, currency) pair.
    pub async fn set_price(&self, price: &Price) -> EngineResult<()> {
        self.get_variant(&price.variant_id).await?;
        self.db.catalog().upsert_price(price).await?;
        Ok(())
    }

    /// Quotes a variant's display price at `now`. A variant with no price
    /// rows yields the defined "not available" zero quote, not an error.
    pub async fn price_quote(&self, variant_id: &str, now: DateTime<Utc>) -> EngineResult<PriceQuote> {
        self.get_variant(variant_id).await?;
        let prices = self.db.catalog().prices_for_variant(variant_id).await?;
        Ok(quote(&prices, now))
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Creates (or resets) the stock record of a variant. The low-stock
    /// threshold comes from the service configuration.
    pub async fn set_stock(
        &self,
        variant_id: &str,
        quantity: i64,
        track_inventory: bool,
        allow_backorder: bool,
    ) -> EngineResult<Inventory> {
        self.get_variant(variant_id).await?;

        let inventory = Inventory {
            variant_id: variant_id.to_string(),
            quantity,
            reserved: 0,
            low_stock_threshold: self.config.low_stock_threshold,
            track_inventory,
            allow_backorder,
            updated_at: Utc::now(),
        };
        self.db.inventory().upsert(&inventory).await?;
        Ok(inventory)
    }

    /// Get-or-create for stock records. A variant without one is
    /// tracked at zero, so sales are refused until stock is recorded.
    async fn ensure_inventory(&self, variant_id: &str) -> EngineResult<Inventory> {
        let inventory_repo = self.db.inventory();
        if let Some(inventory) = inventory_repo.find(variant_id).await? {
            return Ok(inventory);
        }

        debug!(variant_id = %variant_id, "Creating stock record at zero");
        let inventory = Inventory {
            variant_id: variant_id.to_string(),
            quantity: 0,
            reserved: 0,
            low_stock_threshold: self.config.low_stock_threshold,
            track_inventory: true,
            allow_backorder: false,
            updated_at: Utc::now(),
        };
        inventory_repo.upsert(&inventory).await?;
        Ok(inventory)
    }

    /// Decrements stock for a purchase of `quantity` units.
    ///
    /// Variants with `track_inventory` off always sell; a variant with
    /// no stock record yet is tracked at zero. Tracked stock goes
    /// through the repository's atomic conditional UPDATE; a refused
    /// decrement surfaces as [`CatalogError::OutOfStock`] with the
    /// availability at refusal time.
    pub async fn decrease_stock(&self, variant_id: &str, quantity: i64) -> EngineResult<()> {
        let variant = self.get_variant(variant_id).await?;
        let inventory_repo = self.db.inventory();

        let inventory = self.ensure_inventory(variant_id).await?;
        if !inventory.track_inventory {
            return Ok(());
        }

        let decremented = inventory_repo
            .decrease_checked(variant_id, quantity, Utc::now())
            .await?;
        if !decremented {
            let current = inventory_repo.get(variant_id).await?;
            return Err(CatalogError::OutOfStock {
                sku: variant.sku,
                available: current.available_quantity(),
                requested: quantity,
            }
            .into());
        }

        let after = inventory_repo.get(variant_id).await?;
        if after.is_low_stock() {
            warn!(
                sku = %variant.sku,
                available = after.available_quantity(),
                threshold = after.low_stock_threshold,
                "Stock low"
            );
        }
        Ok(())
    }

    /// Increments stock (restock or cancellation). No-op for untracked
    /// variants, mirroring the decrement.
    pub async fn increase_stock(&self, variant_id: &str, quantity: i64) -> EngineResult<()> {
        self.get_variant(variant_id).await?;

        let inventory = self.ensure_inventory(variant_id).await?;
        if !inventory.track_inventory {
            return Ok(());
        }

        self.db
            .inventory()
            .increase(variant_id, quantity, Utc::now())
            .await?;
        Ok(())
    }
}

/// Maps a repository NotFound onto the matching catalog rejection,
/// passing other database failures through.
fn not_found_as(err: DbError, catalog_err: CatalogError) -> EngineError {
    match err {
        DbError::NotFound { .. } => catalog_err.into(),
        other => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_db::DbConfig;

    async fn service() -> CatalogService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        CatalogService::new(db, CatalogConfig::default())
    }

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(a, v)| (a.to_string(), v.to_string()))
            .collect()
    }

    fn new_variant(product_id: &str, sku: &str, attributes: &[(&str, &str)]) -> NewVariant {
        NewVariant {
            product_id: product_id.to_string(),
            sku: sku.to_string(),
            name: None,
            attributes: attrs(attributes),
            is_default: false,
        }
    }

    #[tokio::test]
    async fn test_variant_name_derived_from_attributes() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, Some(Utc::now())).await.unwrap();

        let variant = svc
            .create_variant(new_variant(
                &product.id,
                "TEE-NAVY-L",
                &[("size", "L"), ("color", "Navy")],
            ))
            .await
            .unwrap();

        // Attribute names sort: color before size.
        assert_eq!(variant.name, "Navy / L");
    }

    #[tokio::test]
    async fn test_explicit_name_wins_over_derivation() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();

        let mut input = new_variant(&product.id, "TEE-NAVY-L", &[("color", "Navy")]);
        input.name = Some("Midnight Edition".to_string());
        let variant = svc.create_variant(input).await.unwrap();

        assert_eq!(variant.name, "Midnight Edition");

        // Re-assigning attributes must not clobber the explicit name.
        let updated = svc
            .set_attributes(&variant.id, &attrs(&[("color", "Black")]))
            .await
            .unwrap();
        assert_eq!(updated.name, "Midnight Edition");
    }

    #[tokio::test]
    async fn test_first_variant_becomes_default() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();

        let first = svc
            .create_variant(new_variant(&product.id, "TEE-S", &[]))
            .await
            .unwrap();
        assert!(first.is_default);

        let second = svc
            .create_variant(new_variant(&product.id, "TEE-M", &[]))
            .await
            .unwrap();
        assert!(!second.is_default);
    }

    #[tokio::test]
    async fn test_explicit_default_clears_sibling() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();

        let first = svc
            .create_variant(new_variant(&product.id, "TEE-S", &[]))
            .await
            .unwrap();

        let mut input = new_variant(&product.id, "TEE-M", &[]);
        input.is_default = true;
        let second = svc.create_variant(input).await.unwrap();

        assert!(second.is_default);
        assert!(!svc.get_variant(&first.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn test_deactivating_default_promotes_next_active() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();

        let first = svc
            .create_variant(new_variant(&product.id, "TEE-S", &[]))
            .await
            .unwrap();
        let second = svc
            .create_variant(new_variant(&product.id, "TEE-M", &[]))
            .await
            .unwrap();
        let third = svc
            .create_variant(new_variant(&product.id, "TEE-L", &[]))
            .await
            .unwrap();

        svc.update_variant(&first.id, None, Some(false)).await.unwrap();

        // Creation order: second is the next active variant.
        assert!(svc.get_variant(&second.id).await.unwrap().is_default);
        assert!(!svc.get_variant(&third.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn test_deleting_default_promotes_and_empty_product_has_none() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();

        let first = svc
            .create_variant(new_variant(&product.id, "TEE-S", &[]))
            .await
            .unwrap();
        let second = svc
            .create_variant(new_variant(&product.id, "TEE-M", &[]))
            .await
            .unwrap();

        svc.delete_variant(&first.id).await.unwrap();
        assert!(svc.get_variant(&second.id).await.unwrap().is_default);

        svc.delete_variant(&second.id).await.unwrap();
        // Nothing left to promote; just must not error.
        let options = svc.configurable_options(&product.id).await.unwrap();
        assert!(options.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_variant_exact_match_only() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();

        svc.create_variant(new_variant(
            &product.id,
            "TEE-NAVY-L",
            &[("color", "Navy"), ("size", "L")],
        ))
        .await
        .unwrap();
        svc.create_variant(new_variant(
            &product.id,
            "TEE-NAVY-M",
            &[("color", "Navy"), ("size", "M")],
        ))
        .await
        .unwrap();

        let mut selection = BTreeMap::new();
        selection.insert("color".to_string(), "Navy".to_string());
        selection.insert("size".to_string(), "M".to_string());
        let resolved = svc.resolve_variant(&product.id, &selection).await.unwrap();
        assert_eq!(resolved.sku, "TEE-NAVY-M");

        // Partial selection matches nothing.
        selection.remove("size");
        let err = svc.resolve_variant(&product.id, &selection).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Catalog(CatalogError::InvalidAttributeCombination { .. })
        ));
    }

    #[tokio::test]
    async fn test_configurable_options_span_active_variants() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();

        svc.create_variant(new_variant(
            &product.id,
            "TEE-NAVY-L",
            &[("color", "Navy"), ("size", "L")],
        ))
        .await
        .unwrap();
        let red = svc
            .create_variant(new_variant(
                &product.id,
                "TEE-RED-L",
                &[("color", "Red"), ("size", "L")],
            ))
            .await
            .unwrap();
        svc.update_variant(&red.id, None, Some(false)).await.unwrap();

        let options = svc.configurable_options(&product.id).await.unwrap();
        let colors: Vec<&String> = options["color"].iter().collect();
        assert_eq!(colors, vec!["Navy"], "inactive variants contribute nothing");
        assert_eq!(options["size"].len(), 1);
    }

    #[tokio::test]
    async fn test_price_quote_without_rows_is_unavailable() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();
        let variant = svc
            .create_variant(new_variant(&product.id, "TEE-S", &[]))
            .await
            .unwrap();

        let quote = svc.price_quote(&variant.id, Utc::now()).await.unwrap();
        assert!(!quote.available);
        assert!(quote.current.is_zero());
    }

    #[tokio::test]
    async fn test_oversell_reports_availability() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();
        let variant = svc
            .create_variant(new_variant(&product.id, "TEE-S", &[]))
            .await
            .unwrap();
        svc.set_stock(&variant.id, 3, true, false).await.unwrap();

        let err = svc.decrease_stock(&variant.id, 5).await.unwrap_err();
        match err {
            EngineError::Catalog(CatalogError::OutOfStock {
                sku,
                available,
                requested,
            }) => {
                assert_eq!(sku, "TEE-S");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_untracked_variant_always_sells() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();
        let variant = svc
            .create_variant(new_variant(&product.id, "TEE-S", &[]))
            .await
            .unwrap();

        svc.set_stock(&variant.id, 0, false, false).await.unwrap();
        svc.decrease_stock(&variant.id, 100).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_stock_record_is_tracked_at_zero() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();
        let variant = svc
            .create_variant(new_variant(&product.id, "TEE-S", &[]))
            .await
            .unwrap();

        // No set_stock call yet: the first sale attempt creates the
        // record at zero and is refused.
        let err = svc.decrease_stock(&variant.id, 1).await.unwrap_err();
        match err {
            EngineError::Catalog(CatalogError::OutOfStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 0);
                assert_eq!(requested, 1);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }

        let inventory = svc.db.inventory().get(&variant.id).await.unwrap();
        assert!(inventory.track_inventory);
        assert_eq!(inventory.quantity, 0);

        // Restocking through the same path works.
        svc.increase_stock(&variant.id, 2).await.unwrap();
        svc.decrease_stock(&variant.id, 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_decrements_never_oversell() {
        let svc = service().await;
        let product = svc.create_product("Tee", None, None).await.unwrap();
        let variant = svc
            .create_variant(new_variant(&product.id, "TEE-S", &[]))
            .await
            .unwrap();
        svc.set_stock(&variant.id, 1, true, false).await.unwrap();

        let (a, b) = tokio::join!(
            svc.decrease_stock(&variant.id, 1),
            svc.decrease_stock(&variant.id, 1),
        );

        let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "the last unit can only be sold once");

        let inventory = svc.db.inventory().get(&variant.id).await.unwrap();
        assert_eq!(inventory.quantity, 0);
    }
}
