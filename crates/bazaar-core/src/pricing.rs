//! # Pricing Module
//!
//! Sale-window math and price selection.
//!
//! ## Effective Price Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      current_price(price, now)                          │
//! │                                                                         │
//! │  sale_cents set AND                                                    │
//! │  (sale_start unset OR sale_start ≤ now) AND                            │
//! │  (sale_end   unset OR now ≤ sale_end)      ──► sale price              │
//! │                                                                         │
//! │  otherwise                                  ──► base price              │
//! │                                                                         │
//! │  saved_amount = base − current when on sale, else 0                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-currency: one row wins outright; several rows prefer the
//! default-currency flag; no rows at all yield a defined "not available"
//! quote rather than an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Price;

// =============================================================================
// Sale-Window Math
// =============================================================================

impl Price {
    /// Whether a configured sale is in effect at `now`.
    ///
    /// Either end of the window may be open: an unset start means "began
    /// already", an unset end means "never ends".
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        if self.sale_cents.is_none() {
            return false;
        }
        if let Some(start) = self.sale_start {
            if start > now {
                return false;
            }
        }
        if let Some(end) = self.sale_end {
            if end < now {
                return false;
            }
        }
        true
    }

    /// The price a buyer pays at `now`: the sale price inside the window,
    /// the base price outside it.
    pub fn current_price(&self, now: DateTime<Utc>) -> Money {
        if self.is_on_sale(now) {
            // is_on_sale already proved sale_cents is set
            Money::from_cents(self.sale_cents.unwrap_or(self.base_cents))
        } else {
            Money::from_cents(self.base_cents)
        }
    }

    /// `base − current` when on sale, else zero. Clamped: a sale price
    /// above base never reports a negative saving.
    pub fn saved_amount(&self, now: DateTime<Utc>) -> Money {
        if self.is_on_sale(now) {
            self.base_price().saturating_sub(self.current_price(now))
        } else {
            Money::zero()
        }
    }
}

// =============================================================================
// Price Selection
// =============================================================================

/// Picks the effective price row among a variant's currency rows.
///
/// - exactly one row → that row
/// - several rows → the one flagged default currency, else the first
/// - no rows → None (the caller produces a "not available" quote)
pub fn pick_price(prices: &[Price]) -> Option<&Price> {
    match prices {
        [] => None,
        [single] => Some(single),
        many => many
            .iter()
            .find(|p| p.is_default_currency)
            .or_else(|| many.first()),
    }
}

// =============================================================================
// Price Quote
// =============================================================================

/// The computed answer to "what does this variant cost right now".
///
/// `available == false` (all-zero amounts) is the defined result for a
/// variant with no price rows; absence of a price is not an error.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    /// Whether any price row exists for the variant.
    pub available: bool,

    /// Currency of the selected row.
    pub currency: Option<String>,

    /// Price the buyer pays now.
    pub current: Money,

    /// Base (non-sale) price.
    pub base: Money,

    /// Whether the sale window is active.
    pub on_sale: bool,

    /// `base − current` when on sale, else zero.
    pub saved: Money,
}

impl PriceQuote {
    /// The defined zero quote for a variant without price rows.
    pub fn unavailable() -> Self {
        PriceQuote {
            available: false,
            currency: None,
            current: Money::zero(),
            base: Money::zero(),
            on_sale: false,
            saved: Money::zero(),
        }
    }
}

/// Computes the quote for a variant's price rows at `now`.
pub fn quote(prices: &[Price], now: DateTime<Utc>) -> PriceQuote {
    match pick_price(prices) {
        None => PriceQuote::unavailable(),
        Some(price) => PriceQuote {
            available: true,
            currency: Some(price.currency.clone()),
            current: price.current_price(now),
            base: price.base_price(),
            on_sale: price.is_on_sale(now),
            saved: price.saved_amount(now),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn price(base: i64, sale: Option<i64>) -> Price {
        Price {
            id: "price-1".to_string(),
            variant_id: "var-1".to_string(),
            currency: "USD".to_string(),
            is_default_currency: true,
            base_cents: base,
            sale_cents: sale,
            sale_start: None,
            sale_end: None,
        }
    }

    #[test]
    fn test_sale_inside_window() {
        let now = Utc::now();
        let mut p = price(10000, Some(8000));
        p.sale_start = Some(now - Duration::days(1));
        p.sale_end = Some(now + Duration::days(1));

        assert!(p.is_on_sale(now));
        assert_eq!(p.current_price(now).cents(), 8000);
        assert_eq!(p.saved_amount(now).cents(), 2000);
    }

    #[test]
    fn test_base_outside_window() {
        let now = Utc::now();
        let mut p = price(10000, Some(8000));
        p.sale_start = Some(now - Duration::days(7));
        p.sale_end = Some(now - Duration::days(1));

        assert!(!p.is_on_sale(now));
        assert_eq!(p.current_price(now).cents(), 10000);
        assert_eq!(p.saved_amount(now).cents(), 0);
    }

    #[test]
    fn test_open_ended_window() {
        let now = Utc::now();

        let mut p = price(10000, Some(8000));
        p.sale_end = Some(now + Duration::days(1));
        assert!(p.is_on_sale(now), "open start means already began");

        let mut p = price(10000, Some(8000));
        p.sale_start = Some(now - Duration::days(1));
        assert!(p.is_on_sale(now), "open end means never ends");
    }

    #[test]
    fn test_no_sale_price_means_no_sale() {
        let now = Utc::now();
        let p = price(10000, None);
        assert!(!p.is_on_sale(now));
        assert_eq!(p.current_price(now).cents(), 10000);
    }

    #[test]
    fn test_pick_prefers_default_currency() {
        let mut usd = price(10000, None);
        usd.is_default_currency = false;
        let mut eur = price(9000, None);
        eur.currency = "EUR".to_string();
        eur.is_default_currency = true;

        let prices = vec![usd, eur];
        let picked = pick_price(&prices).unwrap();
        assert_eq!(picked.currency, "EUR");
    }

    #[test]
    fn test_single_row_wins_even_without_flag() {
        let mut only = price(10000, None);
        only.is_default_currency = false;
        let prices = vec![only];
        assert!(pick_price(&prices).is_some());
    }

    #[test]
    fn test_quote_without_prices_is_defined_zero() {
        let q = quote(&[], Utc::now());
        assert!(!q.available);
        assert!(q.current.is_zero());
        assert!(q.saved.is_zero());
        assert!(q.currency.is_none());
    }

    #[test]
    fn test_quote_sale_roundtrip() {
        let now = Utc::now();
        let mut p = price(10000, Some(8000));
        p.sale_start = Some(now - Duration::hours(1));
        p.sale_end = Some(now + Duration::hours(1));

        let q = quote(&[p], now);
        assert!(q.available && q.on_sale);
        assert_eq!(q.current.cents(), 8000);
        assert_eq!(q.base.cents(), 10000);
        assert_eq!(q.saved.cents(), 2000);
    }
}
