//! # Domain Types
//!
//! Core domain types used throughout Bazaar.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Account      │   │    OtpRecord    │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  phone (unique) │   │  channel        │   │  name           │       │
//! │  │  email?         │   │  status         │   │  publish_at?    │       │
//! │  │  password_hash? │   │  attempts       │   │  is_active      │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │ 1:N            │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────▼────────┐       │
//! │  │ AttributeValue  │   │ Price/Inventory │   │ ProductVariant  │       │
//! │  │  ─────────────  │◄──┤  ─────────────  │◄──┤  ─────────────  │       │
//! │  │  attribute      │M:N│  per-currency / │1:1│  sku            │       │
//! │  │  value          │   │  per-variant    │   │  is_default     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (phone, sku, etc.) - human-readable, potentially mutable

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// OTP Channel
// =============================================================================

/// The channel an OTP is delivered over.
///
/// The recipient string is interpreted per channel: a phone number for
/// [`OtpChannel::Sms`], an email address for [`OtpChannel::Email`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OtpChannel {
    /// Delivered as a text message to a phone number.
    Sms,
    /// Delivered to an email address.
    Email,
}

impl OtpChannel {
    /// Stable lowercase name, used in lock keys and log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Sms => "sms",
            OtpChannel::Email => "email",
        }
    }
}

impl fmt::Display for OtpChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// OTP Status
// =============================================================================

/// Lifecycle state of an OTP record.
///
/// ## State Machine
/// ```text
/// PENDING ──verify ok──────────► VERIFIED   (terminal)
/// PENDING ──superseded─────────► EXPIRED    (terminal)
/// PENDING ──ttl passed/attempts► FAILED     (terminal)
/// ```
/// A VERIFIED, EXPIRED, or FAILED record never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OtpStatus {
    /// Awaiting verification.
    Pending,
    /// Successfully verified (consumed).
    Verified,
    /// Superseded by a newer code.
    Expired,
    /// TTL elapsed during verification, or max attempts reached.
    Failed,
}

impl OtpStatus {
    /// Whether this status permits no further transitions.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, OtpStatus::Pending)
    }
}

impl Default for OtpStatus {
    fn default() -> Self {
        OtpStatus::Pending
    }
}

// =============================================================================
// OTP Record
// =============================================================================

/// A single one-time-password issuance and its verification cycle.
///
/// At most one PENDING record exists per (account, channel, recipient)
/// tuple at any time; issuing a new code expires prior pending ones.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OtpRecord {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning account.
    pub account_id: String,

    /// Delivery channel of this code.
    pub channel: OtpChannel,

    /// Current lifecycle state.
    pub status: OtpStatus,

    /// The numeric code (digits only, fixed configured length).
    pub code: String,

    /// Where the code was sent (phone number or email address).
    pub recipient: String,

    /// Number of incorrect submissions so far.
    pub attempts: i64,

    /// When the code was issued.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Issuance time plus the configured TTL.
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,

    /// Set once, when the code is successfully verified.
    #[ts(as = "Option<String>")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl OtpRecord {
    /// Whether the record's TTL has elapsed at `now`.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// =============================================================================
// Account
// =============================================================================

/// A customer account.
///
/// The phone number is the primary login identifier. The email is optional
/// and only usable for login once verified. `password_hash` is `None` for
/// OTP-only accounts ("no usable password").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Account {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Phone number in normalized form (unique, primary identifier).
    pub phone: String,

    /// Email address (unique when present).
    pub email: Option<String>,

    /// Whether the phone number has been proven via OTP.
    pub is_phone_verified: bool,

    /// Whether the email address has been proven via OTP.
    pub is_email_verified: bool,

    /// Whether the account may authenticate at all.
    pub is_active: bool,

    /// Argon2 PHC string, or None for OTP-only accounts.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,

    /// When the account was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// An account is either password-capable or OTP-only.
    #[inline]
    pub fn has_usable_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product template. Owns zero-or-more variants; the sellable units are
/// the variants, not the product itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Whether the product is active (soft delete).
    pub is_active: bool,

    /// Publication timestamp. A product is published once this is in the
    /// past; None means not scheduled.
    #[ts(as = "Option<String>")]
    pub publish_at: Option<DateTime<Utc>>,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// A product is published when active and its publish timestamp is not
    /// in the future.
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.publish_at.map_or(false, |t| t <= now)
    }
}

// =============================================================================
// Product Variant
// =============================================================================

/// A concrete sellable configuration of a product, distinguished by its
/// set of attribute values (one per variant-defining attribute).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductVariant {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning product.
    pub product_id: String,

    /// Stock Keeping Unit - business identifier. Doubles as the
    /// auto-generated name placeholder until a name is derived or set.
    pub sku: String,

    /// Display name. Auto-derived from attribute values unless the caller
    /// set one explicitly.
    pub name: String,

    /// Exactly one variant per product carries this flag whenever at least
    /// one active variant exists. Enforced by the catalog service, not the
    /// database (the invariant is cross-row and conditional).
    pub is_default: bool,

    /// Whether the variant is active (soft delete).
    pub is_active: bool,

    /// When the variant was created. Promotion order follows this.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the variant was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Attribute Value
// =============================================================================

/// One value of a variant-defining attribute, e.g. ("color", "navy").
/// Shared by many variants (many-to-many); owned by none of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AttributeValue {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Attribute name, e.g. "color" or "size".
    pub attribute: String,

    /// The concrete value, e.g. "navy" or "XL".
    pub value: String,
}

// =============================================================================
// Price
// =============================================================================

/// One price row per (variant, currency).
///
/// Holds a base price plus an optional sale price and sale window. Either
/// end of the window may be open-ended. Sale math lives in the `pricing`
/// module.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Price {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// The variant this price belongs to.
    pub variant_id: String,

    /// ISO currency code, e.g. "USD".
    pub currency: String,

    /// Preferred row when a variant is priced in several currencies.
    pub is_default_currency: bool,

    /// Base price in the smallest currency unit.
    pub base_cents: i64,

    /// Sale price, when a sale is configured.
    pub sale_cents: Option<i64>,

    /// Sale window start; None = open start.
    #[ts(as = "Option<String>")]
    pub sale_start: Option<DateTime<Utc>>,

    /// Sale window end; None = open end.
    #[ts(as = "Option<String>")]
    pub sale_end: Option<DateTime<Utc>>,
}

impl Price {
    /// Returns the base price as Money.
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_cents)
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock record, one-to-one with a variant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Inventory {
    /// The variant this stock belongs to (primary key).
    pub variant_id: String,

    /// On-hand quantity.
    pub quantity: i64,

    /// Quantity held by in-flight orders/carts.
    pub reserved: i64,

    /// Threshold under which the stock is reported low.
    pub low_stock_threshold: i64,

    /// Whether stock is tracked at all. Untracked variants always sell.
    pub track_inventory: bool,

    /// Permission to sell despite zero available quantity.
    pub allow_backorder: bool,

    /// When the stock was last adjusted.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_otp_status_terminality() {
        assert!(!OtpStatus::Pending.is_terminal());
        assert!(OtpStatus::Verified.is_terminal());
        assert!(OtpStatus::Expired.is_terminal());
        assert!(OtpStatus::Failed.is_terminal());
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(OtpChannel::Sms.as_str(), "sms");
        assert_eq!(OtpChannel::Email.as_str(), "email");
    }

    #[test]
    fn test_product_published_window() {
        let now = Utc::now();
        let mut product = Product {
            id: "p1".to_string(),
            name: "Shirt".to_string(),
            description: None,
            is_active: true,
            publish_at: Some(now - Duration::hours(1)),
            created_at: now,
            updated_at: now,
        };
        assert!(product.is_published(now));

        product.publish_at = Some(now + Duration::hours(1));
        assert!(!product.is_published(now));

        product.publish_at = None;
        assert!(!product.is_published(now));

        product.publish_at = Some(now - Duration::hours(1));
        product.is_active = false;
        assert!(!product.is_published(now));
    }
}
