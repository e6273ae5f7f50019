//! # bazaar-core: Pure Business Logic for Bazaar
//!
//! This crate is the **heart** of the Bazaar backend. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Bazaar Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 HTTP layer (out of scope)                       │   │
//! │  │     request OTP ──► verify ──► login    browse ──► buy         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bazaar-engine                                │   │
//! │  │    OtpEngine, CatalogService, NotificationGateway, AuthFlow    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │    otp    │  │  pricing  │  │  variant  │  │   │
//! │  │   │  Account  │  │  check_   │  │   sale    │  │  options  │  │   │
//! │  │   │ OtpRecord │  │submission │  │  windows  │  │  default  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bazaar-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Account, OtpRecord, Product, Inventory, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`otp`] - OTP code generation and verification state machine
//! - [`pricing`] - Sale-window math and price selection
//! - [`variant`] - Variant name/option derivation and default promotion
//! - [`inventory`] - Availability checks
//! - [`validation`] - Identifier and catalog field validation
//! - [`config`] - Engine configuration with documented defaults
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic except for the CSPRNG draw
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod inventory;
pub mod money;
pub mod otp;
pub mod pricing;
pub mod validation;
pub mod variant;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use bazaar_core::Money` instead of
// `use bazaar_core::money::Money`

pub use config::{CatalogConfig, OtpConfig};
pub use error::{CatalogError, OtpError, ValidationError, VerifyError, VerifyErrorKind};
pub use money::Money;
pub use pricing::PriceQuote;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency assumed when a price row doesn't specify one.
///
/// Kept as a constant because the core treats currency codes as opaque;
/// currency configuration belongs to the (out-of-scope) settings surface.
pub const DEFAULT_CURRENCY: &str = "USD";
