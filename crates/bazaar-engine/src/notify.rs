//! # Notification Gateway
//!
//! Channel-agnostic message dispatch for OTP codes and account mail.
//!
//! ## Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     NotificationGateway                          │
//! │                                                                  │
//! │   dispatch(kind, recipient, payload)                             │
//! │        │                                                         │
//! │        ▼                                                         │
//! │   ┌──────────────────────────────────────────────┐               │
//! │   │  registry: ChannelKind → dyn Channel         │               │
//! │   │    Sms      → SMS aggregator / console       │               │
//! │   │    Email    → SMTP / console                 │               │
//! │   │    Telegram → bot API / console              │               │
//! │   └──────────────────────────────────────────────┘               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concrete transports are injected by the host application; this crate
//! ships [`ConsoleChannel`] for development and tests. A missing
//! registration is a dispatch error, not a silent drop: the OTP engine
//! needs to know the code never left the building.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use bazaar_core::OtpChannel;

// =============================================================================
// Channel Kind
// =============================================================================

/// Delivery transport family.
///
/// Wider than [`OtpChannel`]: OTP codes only travel over SMS and email,
/// but the gateway also carries order and account mail which may go to
/// a Telegram bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Sms,
    Email,
    Telegram,
}

impl ChannelKind {
    /// Stable lowercase name for registry keys and log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Sms => "sms",
            ChannelKind::Email => "email",
            ChannelKind::Telegram => "telegram",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OtpChannel> for ChannelKind {
    fn from(channel: OtpChannel) -> Self {
        match channel {
            OtpChannel::Sms => ChannelKind::Sms,
            OtpChannel::Email => ChannelKind::Email,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by notification dispatch.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// No channel implementation is registered for the requested kind.
    #[error("No {0} channel is configured")]
    ChannelNotConfigured(ChannelKind),

    /// The transport reported a delivery failure.
    #[error("Delivery via {channel} failed: {message}")]
    DeliveryFailed {
        channel: ChannelKind,
        message: String,
    },
}

// =============================================================================
// Payload
// =============================================================================

/// A message handed to a channel for delivery.
#[derive(Debug, Clone)]
pub struct MessagePayload {
    /// Subject line. SMS and Telegram transports ignore it.
    pub subject: Option<String>,

    /// Message body, already rendered.
    pub message: String,
}

impl MessagePayload {
    /// Renders the standard OTP message for a code.
    pub fn otp(code: &str, ttl_seconds: i64) -> Self {
        MessagePayload {
            subject: Some("Your verification code".to_string()),
            message: format!(
                "Your verification code is {code}. It expires in {} minutes.",
                // round up: a 90-second TTL reads as "2 minutes"
                (ttl_seconds + 59) / 60
            ),
        }
    }

    /// A plain message with no subject.
    pub fn plain(message: impl Into<String>) -> Self {
        MessagePayload {
            subject: None,
            message: message.into(),
        }
    }
}

// =============================================================================
// Channel Trait
// =============================================================================

/// A delivery transport for one channel kind.
///
/// Implementations must be cheap to call concurrently; the gateway holds
/// them behind `Arc` and never serializes dispatches.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// The channel kind this transport serves.
    fn kind(&self) -> ChannelKind;

    /// Delivers one message. Errors bubble to the caller; the OTP engine
    /// rolls back the pending record on failure.
    async fn send(&self, recipient: &str, payload: &MessagePayload)
        -> Result<(), NotificationError>;
}

// =============================================================================
// Gateway
// =============================================================================

/// Dispatch registry mapping channel kinds to transports.
#[derive(Clone, Default)]
pub struct NotificationGateway {
    channels: HashMap<ChannelKind, Arc<dyn NotificationChannel>>,
}

impl NotificationGateway {
    /// Creates an empty gateway. Every dispatch fails until channels are
    /// registered.
    pub fn new() -> Self {
        NotificationGateway {
            channels: HashMap::new(),
        }
    }

    /// Creates a gateway with [`ConsoleChannel`]s on every kind, for
    /// development and tests.
    pub fn console() -> Self {
        let mut gateway = NotificationGateway::new();
        for kind in [ChannelKind::Sms, ChannelKind::Email, ChannelKind::Telegram] {
            gateway.register(Arc::new(ConsoleChannel::new(kind)));
        }
        gateway
    }

    /// Registers (or replaces) the transport for a channel kind.
    pub fn register(&mut self, channel: Arc<dyn NotificationChannel>) {
        debug!(kind = channel.kind().as_str(), "Registering notification channel");
        self.channels.insert(channel.kind(), channel);
    }

    /// Dispatches one message on the given channel.
    pub async fn dispatch(
        &self,
        kind: ChannelKind,
        recipient: &str,
        payload: &MessagePayload,
    ) -> Result<(), NotificationError> {
        let channel = self
            .channels
            .get(&kind)
            .ok_or(NotificationError::ChannelNotConfigured(kind))?;

        channel.send(recipient, payload).await
    }
}

impl fmt::Debug for NotificationGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.channels.keys().map(|k| k.as_str()).collect();
        f.debug_struct("NotificationGateway")
            .field("channels", &kinds)
            .finish()
    }
}

// =============================================================================
// Console Channel
// =============================================================================

/// Development transport: logs the message instead of sending it.
#[derive(Debug)]
pub struct ConsoleChannel {
    kind: ChannelKind,
}

impl ConsoleChannel {
    /// Creates a console transport for the given channel kind.
    pub fn new(kind: ChannelKind) -> Self {
        ConsoleChannel { kind }
    }
}

#[async_trait]
impl NotificationChannel for ConsoleChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(
        &self,
        recipient: &str,
        payload: &MessagePayload,
    ) -> Result<(), NotificationError> {
        info!(
            channel = self.kind.as_str(),
            recipient = %recipient,
            subject = payload.subject.as_deref().unwrap_or(""),
            body = %payload.message,
            "Console notification (not actually delivered)"
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingChannel {
        kind: ChannelKind,
        sent: AtomicUsize,
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        async fn send(
            &self,
            _recipient: &str,
            _payload: &MessagePayload,
        ) -> Result<(), NotificationError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_kind() {
        let sms = Arc::new(RecordingChannel {
            kind: ChannelKind::Sms,
            sent: AtomicUsize::new(0),
        });
        let mut gateway = NotificationGateway::new();
        gateway.register(sms.clone());

        let payload = MessagePayload::otp("123456", 120);
        gateway
            .dispatch(ChannelKind::Sms, "+15550001111", &payload)
            .await
            .unwrap();
        assert_eq!(sms.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_channel_is_an_error() {
        let gateway = NotificationGateway::new();
        let payload = MessagePayload::otp("123456", 120);
        let err = gateway
            .dispatch(ChannelKind::Telegram, "@user", &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::ChannelNotConfigured(_)));
    }

    #[test]
    fn test_otp_body_rounds_ttl_up() {
        let payload = MessagePayload::otp("123456", 90);
        assert!(payload.message.contains("2 minutes"));
    }
}
