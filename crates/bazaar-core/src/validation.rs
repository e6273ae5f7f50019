//! # Validation Module
//!
//! Input validation for identifiers and catalog fields.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront (TypeScript)                                      │
//! │  └── Basic format checks, immediate user feedback                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (Rust)                                           │
//! │  └── Identifier classification, normalization, business rules          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL / UNIQUE / foreign key constraints                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::OtpChannel;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Classification
// =============================================================================

/// What kind of login identifier a raw string is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// An email address.
    Email,
    /// A phone number.
    Phone,
}

/// Determines whether an identifier is an email or a phone number and
/// returns its kind plus the normalized value.
///
/// The split rule is the presence of '@': anything containing it must be a
/// valid email, anything else must be a valid phone number. Phone numbers
/// are normalized to `+<digits>` form (an international `00` prefix
/// becomes `+`).
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::{classify_identifier, IdentifierKind};
///
/// let (kind, value) = classify_identifier("  user@example.com ").unwrap();
/// assert_eq!(kind, IdentifierKind::Email);
/// assert_eq!(value, "user@example.com");
///
/// let (kind, value) = classify_identifier("0049 171 123-4567").unwrap();
/// assert_eq!(kind, IdentifierKind::Phone);
/// assert_eq!(value, "+491711234567");
/// ```
pub fn classify_identifier(raw: &str) -> ValidationResult<(IdentifierKind, String)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "identifier".to_string(),
        });
    }

    if trimmed.contains('@') {
        validate_email(trimmed)?;
        Ok((IdentifierKind::Email, trimmed.to_ascii_lowercase()))
    } else {
        let normalized = normalize_phone(trimmed)?;
        Ok((IdentifierKind::Phone, normalized))
    }
}

/// Validates an email address. Deliberately conservative: exactly one '@',
/// a non-empty local part, and a dotted domain. Deliverability is proven
/// by the OTP, not by parsing.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let mut parts = email.split('@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if parts.next().is_some() {
        return Err(invalid("multiple '@' characters"));
    }
    if local.is_empty() {
        return Err(invalid("missing local part"));
    }
    if domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err(invalid("invalid domain"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }
    Ok(())
}

/// Normalizes a phone number to `+<digits>`.
///
/// Accepts separators (spaces, dashes, dots, parentheses), an optional
/// leading `+`, or an international `00` prefix. Requires 7-15 digits
/// (E.164 bounds).
pub fn normalize_phone(phone: &str) -> ValidationResult<String> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "phone".to_string(),
        reason: reason.to_string(),
    };

    let mut digits = String::new();
    let mut has_plus = false;
    for (i, c) in phone.chars().enumerate() {
        match c {
            '+' if i == 0 => has_plus = true,
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(invalid("unexpected character")),
        }
    }

    // "0049..." is the international form of "+49..."
    if !has_plus && digits.starts_with("00") {
        digits = digits[2..].to_string();
    }

    if digits.len() < 7 || digits.len() > 15 {
        return Err(invalid("expected 7-15 digits"));
    }

    Ok(format!("+{}", digits))
}

// =============================================================================
// Recipient Validation
// =============================================================================

/// Validates that a recipient fits the delivery channel: a phone number
/// for SMS, an email address for email. Returns the normalized recipient.
pub fn validate_recipient(channel: OtpChannel, recipient: &str) -> ValidationResult<String> {
    let trimmed = recipient.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "recipient".to_string(),
        });
    }
    match channel {
        OtpChannel::Sms => normalize_phone(trimmed),
        OtpChannel::Email => {
            validate_email(trimmed)?;
            Ok(trimmed.to_ascii_lowercase())
        }
    }
}

// =============================================================================
// Catalog Field Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
