//! # Repository Modules
//!
//! One repository struct per aggregate, each holding a clone of the
//! shared [`SqlitePool`](sqlx::SqlitePool). Repositories move rows;
//! cross-row rules (OTP state machine, default-variant maintenance,
//! availability policy) belong to the engine crate.

pub mod account;
pub mod catalog;
pub mod inventory;
pub mod otp;

pub use account::AccountRepository;
pub use catalog::CatalogRepository;
pub use inventory::InventoryRepository;
pub use otp::OtpRepository;
