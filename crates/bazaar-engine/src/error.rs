//! # Engine Error Types
//!
//! One umbrella error for the orchestration layer. Domain rejections
//! ([`OtpError`], [`CatalogError`]) pass through untouched so callers
//! can match on them; infrastructure failures (database, dispatch,
//! token handling) get their own variants.

use thiserror::Error;

use bazaar_core::{CatalogError, OtpError, ValidationError};
use bazaar_db::DbError;

use crate::notify::NotificationError;

/// Errors raised by the engine layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Domain rejection from the OTP flow (cooldown, bad code, ...).
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// Domain rejection from the catalog flow (unknown variant, out of
    /// stock, ...).
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Caller input failed validation before any flow ran.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Database failure.
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    /// Notification dispatch failure the caller must see (OTP dispatch;
    /// best-effort sends swallow this variant instead).
    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// Token creation/validation or password hashing failure.
    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),

    /// Credentials did not match. Deliberately carries no detail about
    /// whether the account exists.
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
