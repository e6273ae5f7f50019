//! # Engine Configuration
//!
//! Explicit configuration structs consumed by the OTP and catalog engines.
//! There is no implicit global settings object: engines receive one of
//! these at construction and the defaults below are the documented
//! contract.

use serde::{Deserialize, Serialize};

// =============================================================================
// OTP Configuration
// =============================================================================

/// Tunables for OTP issuance and verification.
///
/// ## Example
/// ```rust
/// use bazaar_core::config::OtpConfig;
///
/// let config = OtpConfig::default().cooldown_seconds(30);
/// assert_eq!(config.cooldown_seconds, 30);
/// assert_eq!(config.code_length, 6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Number of digits in a generated code.
    /// Default: 6
    pub code_length: usize,

    /// Lifetime of a code, in seconds.
    /// Default: 120 (2 minutes)
    pub ttl_seconds: i64,

    /// Incorrect submissions allowed before the record fails.
    /// Default: 5
    pub max_attempts: i64,

    /// Minimum wait between successive generation requests for the same
    /// (account, channel, recipient) tuple, in seconds.
    /// Default: 60
    pub cooldown_seconds: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        OtpConfig {
            code_length: 6,
            ttl_seconds: 120,
            max_attempts: 5,
            cooldown_seconds: 60,
        }
    }
}

impl OtpConfig {
    /// Sets the code length.
    pub fn code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Sets the code TTL in seconds.
    pub fn ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Sets the maximum number of incorrect submissions.
    pub fn max_attempts(mut self, attempts: i64) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the generation cooldown in seconds. Zero disables throttling.
    pub fn cooldown_seconds(mut self, seconds: i64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }
}

// =============================================================================
// Catalog Configuration
// =============================================================================

/// Tunables for the catalog/inventory engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Default low-stock threshold applied when creating inventory rows.
    /// Default: 10
    pub low_stock_threshold: i64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            low_stock_threshold: 10,
        }
    }
}

impl CatalogConfig {
    /// Sets the default low-stock threshold.
    pub fn low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_defaults() {
        let config = OtpConfig::default();
        assert_eq!(config.code_length, 6);
        assert_eq!(config.ttl_seconds, 120);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.cooldown_seconds, 60);
    }

    #[test]
    fn test_builder_setters() {
        let config = OtpConfig::default().ttl_seconds(300).max_attempts(3);
        assert_eq!(config.ttl_seconds, 300);
        assert_eq!(config.max_attempts, 3);

        let catalog = CatalogConfig::default().low_stock_threshold(4);
        assert_eq!(catalog.low_stock_threshold, 4);
    }

    #[test]
    fn test_catalog_defaults() {
        assert_eq!(CatalogConfig::default().low_stock_threshold, 10);
    }
}
