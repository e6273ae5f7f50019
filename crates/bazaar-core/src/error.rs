//! # Error Types
//!
//! Domain-specific error types for bazaar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bazaar-core errors (this file)                                        │
//! │  ├── OtpError         - Generation throttling / dispatch / rejection   │
//! │  │    └── VerifyError - Tagged rejection kinds with default messages   │
//! │  ├── CatalogError     - Lookup, resolution, and stock failures         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bazaar-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: engines raise typed errors → handler layer (out of scope)       │
//! │        translates them to user-facing responses                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (remaining seconds, SKU, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each rejection kind has a sensible default message; callers may
//!    override it without losing the kind

use thiserror::Error;

// =============================================================================
// OTP Verification Rejection
// =============================================================================

/// The reason a code submission was rejected.
///
/// The set is deliberately coarse: a caller learns only what is listed
/// here, never which secret state caused it beyond that (no aid to
/// enumeration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyErrorKind {
    /// No OTP record exists for the tuple.
    NotFound,
    /// The latest record was already consumed by a successful verify.
    AlreadyUsed,
    /// The latest record was superseded or previously failed.
    NoLongerValid,
    /// The TTL elapsed before this submission arrived.
    Expired,
    /// The attempt limit was reached.
    MaxAttemptsExceeded,
    /// Wrong code; the counter was incremented.
    CodeMismatch {
        /// Attempts left before the record fails.
        remaining: i64,
    },
}

/// A tagged verification rejection: a kind plus an optional message
/// override. Display falls back to the kind's default message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct VerifyError {
    pub kind: VerifyErrorKind,
    message: Option<String>,
}

impl VerifyError {
    /// Creates a rejection with the kind's default message.
    pub fn new(kind: VerifyErrorKind) -> Self {
        VerifyError {
            kind,
            message: None,
        }
    }

    /// Creates a rejection with a caller-supplied message.
    pub fn with_message(kind: VerifyErrorKind, message: impl Into<String>) -> Self {
        VerifyError {
            kind,
            message: Some(message.into()),
        }
    }

    /// The user-facing message: the override if set, else the default for
    /// the kind.
    pub fn message(&self) -> String {
        if let Some(msg) = &self.message {
            return msg.clone();
        }
        match &self.kind {
            VerifyErrorKind::NotFound => "No verification code was found".to_string(),
            VerifyErrorKind::AlreadyUsed => "This code has already been used".to_string(),
            VerifyErrorKind::NoLongerValid => "This code is no longer valid".to_string(),
            VerifyErrorKind::Expired => "This code has expired".to_string(),
            VerifyErrorKind::MaxAttemptsExceeded => {
                "Maximum verification attempts exceeded".to_string()
            }
            VerifyErrorKind::CodeMismatch { remaining } => {
                format!("Incorrect code, {} attempts remaining", remaining)
            }
        }
    }
}

impl From<VerifyErrorKind> for VerifyError {
    fn from(kind: VerifyErrorKind) -> Self {
        VerifyError::new(kind)
    }
}

// =============================================================================
// OTP Error
// =============================================================================

/// Errors raised by OTP generation and verification.
#[derive(Debug, Error)]
pub enum OtpError {
    /// Generation attempted too soon after a prior code for the same
    /// tuple. Recoverable by waiting.
    #[error("Please wait {remaining_seconds} seconds before requesting a new code")]
    Cooldown { remaining_seconds: i64 },

    /// Dispatch to the notification gateway failed. The just-created
    /// record is rolled back, so an immediate retry is valid.
    #[error("Failed to deliver verification code: {0}")]
    Generation(String),

    /// A code submission was rejected; see [`VerifyError`] for the reason.
    #[error(transparent)]
    Validation(#[from] VerifyError),
}

impl OtpError {
    /// Shortcut for a default-message rejection.
    pub fn rejection(kind: VerifyErrorKind) -> Self {
        OtpError::Validation(VerifyError::new(kind))
    }
}

// =============================================================================
// Catalog Error
// =============================================================================

/// Errors raised by variant resolution, pricing, and inventory.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Product ID doesn't exist or was soft-deleted.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Variant ID doesn't exist or was soft-deleted.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// No active variant matches the submitted attribute selections.
    #[error("No variant of product {product_id} matches the selected options")]
    InvalidAttributeCombination { product_id: String },

    /// Inventory decrement rejected by the availability check.
    ///
    /// ## User Workflow
    /// ```text
    /// Purchase (qty: 5)
    ///      │
    ///      ▼
    /// Locked re-check: available=3, no backorder
    ///      │
    ///      ▼
    /// OutOfStock { sku: "TEE-NAVY-L", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    OutOfStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., malformed email or phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with OtpError.
pub type OtpResult<T> = Result<T, OtpError>;

/// Convenience type alias for Results with CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_messages() {
        let err = VerifyError::new(VerifyErrorKind::CodeMismatch { remaining: 3 });
        assert_eq!(err.to_string(), "Incorrect code, 3 attempts remaining");

        let err = VerifyError::new(VerifyErrorKind::Expired);
        assert_eq!(err.to_string(), "This code has expired");
    }

    #[test]
    fn test_message_override_keeps_kind() {
        let err = VerifyError::with_message(VerifyErrorKind::NotFound, "try requesting a code");
        assert_eq!(err.to_string(), "try requesting a code");
        assert_eq!(err.kind, VerifyErrorKind::NotFound);
    }

    #[test]
    fn test_cooldown_message() {
        let err = OtpError::Cooldown {
            remaining_seconds: 42,
        };
        assert_eq!(
            err.to_string(),
            "Please wait 42 seconds before requesting a new code"
        );
    }

    #[test]
    fn test_out_of_stock_message() {
        let err = CatalogError::OutOfStock {
            sku: "TEE-NAVY-L".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for TEE-NAVY-L: available 3, requested 5"
        );
    }
}
