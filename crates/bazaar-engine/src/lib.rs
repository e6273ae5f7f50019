//! # Bazaar Engine
//!
//! Orchestration layer of the Bazaar backend core: the OTP engine, the
//! catalog service, the notification gateway, and the auth flows.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          bazaar-engine                              │
//! │                                                                     │
//! │   ┌──────────┐     ┌───────────┐      ┌──────────────────────┐      │
//! │   │ AuthFlow │────▶│ OtpEngine │─────▶│ NotificationGateway  │      │
//! │   └────┬─────┘     └─────┬─────┘      └──────────────────────┘      │
//! │        │                 │                                          │
//! │        │           ┌─────┴──────────┐                               │
//! │        └──────────▶│  bazaar-db     │◀──┐                           │
//! │                    │  repositories  │   │   ┌────────────────┐      │
//! │                    └────────────────┘   └───│ CatalogService │      │
//! │                                             └────────────────┘      │
//! │                                                                     │
//! │   Decision rules (state machine, pricing, name derivation) come     │
//! │   from bazaar-core; this crate only loads, decides, and persists.   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An HTTP layer is expected to sit on top of this crate and translate
//! [`EngineError`] variants to status codes; none of that lives here.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod notify;
pub mod otp_engine;

pub use auth::{AuthError, AuthFlow, Claims, PasswordAuth, TokenConfig, TokenIssuer, TokenPair};
pub use catalog::{CatalogService, NewVariant};
pub use error::{EngineError, EngineResult};
pub use notify::{
    ChannelKind, ConsoleChannel, MessagePayload, NotificationChannel, NotificationError,
    NotificationGateway,
};
pub use otp_engine::OtpEngine;
