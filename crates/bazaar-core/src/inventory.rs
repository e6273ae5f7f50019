//! # Inventory Availability
//!
//! Pure availability checks over an [`Inventory`] record. The atomic
//! check-then-decrement lives in the database layer; these helpers answer
//! the read-only question and classify low stock.

use crate::types::Inventory;

impl Inventory {
    /// On-hand minus reserved, never negative.
    #[inline]
    pub fn available_quantity(&self) -> i64 {
        (self.quantity - self.reserved).max(0)
    }

    /// Whether `quantity` units can be sold right now.
    ///
    /// Untracked stock always sells; backorders always sell; otherwise the
    /// available quantity must cover the request.
    pub fn is_available(&self, quantity: i64) -> bool {
        if !self.track_inventory {
            return true;
        }
        if self.allow_backorder {
            return true;
        }
        self.available_quantity() >= quantity
    }

    /// Whether available stock has fallen to the low-stock threshold.
    /// Untracked stock is never low.
    pub fn is_low_stock(&self) -> bool {
        self.track_inventory && self.available_quantity() <= self.low_stock_threshold
    }
}
