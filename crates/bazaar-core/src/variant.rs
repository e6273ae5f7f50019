//! # Variant Resolution Helpers
//!
//! Pure pieces of the variant engine: name derivation, configurable-option
//! extraction, default-variant promotion choice, and selection matching.
//! The catalog service applies these over the store.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AttributeValue, ProductVariant};

// =============================================================================
// Name Derivation
// =============================================================================

/// Derives a human-readable variant name by concatenating attribute values
/// ordered by attribute name. The ordering is stable and deterministic, so
/// the same attribute set always produces the same name.
///
/// ## Example
/// ```rust
/// use bazaar_core::types::AttributeValue;
/// use bazaar_core::variant::derive_variant_name;
///
/// let values = vec![
///     AttributeValue { id: "1".into(), attribute: "size".into(), value: "L".into() },
///     AttributeValue { id: "2".into(), attribute: "color".into(), value: "Navy".into() },
/// ];
/// // "color" sorts before "size"
/// assert_eq!(derive_variant_name(&values), "Navy / L");
/// ```
pub fn derive_variant_name(values: &[AttributeValue]) -> String {
    let mut sorted: Vec<&AttributeValue> = values.iter().collect();
    sorted.sort_by(|a, b| a.attribute.cmp(&b.attribute));
    sorted
        .iter()
        .map(|v| v.value.as_str())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Whether the auto-derived name should replace the current one.
///
/// Detection: the SKU doubles as the auto-generated placeholder, so a name
/// equal to the SKU (or empty) was never set by the caller.
pub fn should_derive_name(variant: &ProductVariant) -> bool {
    variant.name.is_empty() || variant.name == variant.sku
}

// =============================================================================
// Configurable Options
// =============================================================================

/// Maps attribute name → sorted distinct values across the given variants'
/// attribute sets. Drives "pick your configuration" UI without exposing
/// internal IDs.
pub fn configurable_options(value_sets: &[Vec<AttributeValue>]) -> BTreeMap<String, BTreeSet<String>> {
    let mut options: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for values in value_sets {
        for v in values {
            options
                .entry(v.attribute.clone())
                .or_default()
                .insert(v.value.clone());
        }
    }
    options
}

// =============================================================================
// Selection Matching
// =============================================================================

/// Whether a variant's attribute-value set is exactly the submitted
/// selection: same attributes, same values, nothing extra on either side.
pub fn matches_selection(
    values: &[AttributeValue],
    selection: &BTreeMap<String, String>,
) -> bool {
    let variant_map: BTreeMap<&str, &str> = values
        .iter()
        .map(|v| (v.attribute.as_str(), v.value.as_str()))
        .collect();
    let selection_map: BTreeMap<&str, &str> = selection
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    variant_map == selection_map
}

// =============================================================================
// Default Promotion Choice
// =============================================================================

/// Chooses the variant to promote to default: the first active one in
/// creation order. Returns None when no active variant remains (a product
/// with zero active variants has no default).
pub fn pick_default(variants: &[ProductVariant]) -> Option<&ProductVariant> {
    let mut candidates: Vec<&ProductVariant> =
        variants.iter().filter(|v| v.is_active).collect();
    // Stable order even if the caller's slice isn't: creation time, then id.
    candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    candidates.first().copied()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn value(attribute: &str, value: &str) -> AttributeValue {
        AttributeValue {
            id: format!("{}-{}", attribute, value),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    fn variant(id: &str, active: bool, created_offset_secs: i64) -> ProductVariant {
        let now = Utc::now();
        ProductVariant {
            id: id.to_string(),
            product_id: "prod-1".to_string(),
            sku: format!("SKU-{}", id),
            name: format!("SKU-{}", id),
            is_default: false,
            is_active: active,
            created_at: now + Duration::seconds(created_offset_secs),
            updated_at: now,
        }
    }

    #[test]
    fn test_name_ordered_by_attribute() {
        let values = vec![value("size", "XL"), value("color", "Navy")];
        assert_eq!(derive_variant_name(&values), "Navy / XL");
    }

    #[test]
    fn test_name_derivation_detection() {
        let mut v = variant("a", true, 0);
        assert!(should_derive_name(&v), "name == sku is the placeholder");

        v.name = "Navy / XL".to_string();
        assert!(!should_derive_name(&v), "caller-set name is kept");
    }

    #[test]
    fn test_options_sorted_and_distinct() {
        let sets = vec![
            vec![value("color", "Navy"), value("size", "L")],
            vec![value("color", "Navy"), value("size", "M")],
            vec![value("color", "Red"), value("size", "L")],
        ];
        let options = configurable_options(&sets);

        assert_eq!(options.len(), 2);
        let colors: Vec<&String> = options["color"].iter().collect();
        assert_eq!(colors, ["Navy", "Red"]);
        let sizes: Vec<&String> = options["size"].iter().collect();
        assert_eq!(sizes, ["L", "M"]);
    }

    #[test]
    fn test_selection_must_match_exactly() {
        let values = vec![value("color", "Navy"), value("size", "L")];

        let mut selection = BTreeMap::new();
        selection.insert("color".to_string(), "Navy".to_string());
        selection.insert("size".to_string(), "L".to_string());
        assert!(matches_selection(&values, &selection));

        selection.insert("material".to_string(), "cotton".to_string());
        assert!(!matches_selection(&values, &selection), "extra attribute");

        let mut partial = BTreeMap::new();
        partial.insert("color".to_string(), "Navy".to_string());
        assert!(!matches_selection(&values, &partial), "missing attribute");
    }

    #[test]
    fn test_pick_default_first_active_in_creation_order() {
        let variants = vec![
            variant("b", false, 0),
            variant("c", true, 10),
            variant("a", true, 5),
        ];
        let picked = pick_default(&variants).unwrap();
        assert_eq!(picked.id, "a", "earliest created active variant wins");
    }

    #[test]
    fn test_pick_default_none_when_all_inactive() {
        let variants = vec![variant("a", false, 0), variant("b", false, 1)];
        assert!(pick_default(&variants).is_none());
    }
}
