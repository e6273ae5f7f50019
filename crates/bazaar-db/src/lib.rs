//! # Bazaar Database Layer
//!
//! SQLite persistence for the Bazaar backend core, built on `sqlx`.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          bazaar-db                              │
//! │                                                                 │
//! │  ┌───────────┐   ┌────────────────────────────────────────────┐ │
//! │  │ Database  │──▶│               repositories                 │ │
//! │  │  (pool)   │   │  accounts / otp_codes / catalog / stock    │ │
//! │  └───────────┘   └────────────────────────────────────────────┘ │
//! │        │                                                        │
//! │  ┌───────────┐   embedded migrations (migrations/sqlite/)       │
//! │  │ MIGRATOR  │                                                  │
//! │  └───────────┘                                                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Domain types come from `bazaar-core` (compiled with its `sqlx`
//! feature so they derive `FromRow`/`Type`); this crate adds nothing
//! but plumbing and row movement.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{AccountRepository, CatalogRepository, InventoryRepository, OtpRepository};
