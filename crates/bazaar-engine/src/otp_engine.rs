//! # OTP Engine
//!
//! Generation and verification flows for one-time passcodes.
//!
//! ## Generation Flow
//! ```text
//! generate_and_send(account, channel, recipient)
//!      │
//!      ▼
//! ┌─ tuple lock ────────────────────────────────────────────────┐
//! │  1. cooldown check against the latest record (any status)   │
//! │  2. expire prior PENDING records for the tuple              │
//! │  3. insert fresh PENDING record (random numeric code)       │
//! │  4. dispatch via the notification gateway                   │
//! │     └─ on failure: delete the record (no phantom cooldown)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Verification Flow
//! The decision itself is [`check_submission`] in `bazaar-core`; this
//! engine loads the latest record, applies the decided transition, and
//! translates the outcome into an [`OtpError`].
//!
//! ## Concurrency
//! Every flow runs under an in-process lock keyed by the
//! (account, channel, recipient) tuple, so two concurrent submissions
//! of the same code are serialized: the first consumes the record, the
//! second sees VERIFIED and is told the code was already used. The
//! attempt counter additionally increments via a single SQL statement,
//! so even without the lock no guess can be lost to a stale read.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bazaar_core::otp::{check_submission, cooldown_remaining, generate_numeric_code, VerifyOutcome};
use bazaar_core::validation::validate_recipient;
use bazaar_core::{OtpChannel, OtpConfig, OtpError, OtpRecord, OtpStatus, VerifyErrorKind};
use bazaar_db::Database;

use crate::error::EngineResult;
use crate::notify::{MessagePayload, NotificationGateway};

/// One lock per (account, channel, recipient) tuple.
type TupleKey = (String, OtpChannel, String);

/// OTP generation and verification engine.
pub struct OtpEngine {
    db: Database,
    gateway: Arc<NotificationGateway>,
    config: OtpConfig,
    locks: Mutex<HashMap<TupleKey, Arc<Mutex<()>>>>,
}

impl OtpEngine {
    /// Creates a new engine over a database and a notification gateway.
    pub fn new(db: Database, gateway: Arc<NotificationGateway>, config: OtpConfig) -> Self {
        OtpEngine {
            db,
            gateway,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Returns the lock guarding one tuple, creating it on first use.
    /// Dropped guards leave the map entry behind; entries whose lock is
    /// no longer held anywhere are swept on each acquisition.
    async fn tuple_lock(&self, key: TupleKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key).or_default().clone()
    }

    /// Generates a fresh code for the tuple and dispatches it.
    ///
    /// Fails with [`OtpError::Cooldown`] when the latest record for the
    /// tuple (whatever its status) is younger than the cooldown window,
    /// and with [`OtpError::Generation`] when dispatch fails; in the
    /// latter case the just-created record is deleted so the caller can
    /// retry immediately.
    pub async fn generate_and_send(
        &self,
        account_id: &str,
        channel: OtpChannel,
        recipient: &str,
    ) -> EngineResult<OtpRecord> {
        let recipient = validate_recipient(channel, recipient)?;

        let lock = self
            .tuple_lock((account_id.to_string(), channel, recipient.clone()))
            .await;
        let _guard = lock.lock().await;

        let otp_codes = self.db.otp_codes();
        let now = Utc::now();

        if let Some(latest) = otp_codes.find_latest(account_id, channel, &recipient).await? {
            let remaining =
                cooldown_remaining(latest.created_at, self.config.cooldown_seconds, now);
            if remaining > 0 {
                debug!(
                    account_id = %account_id,
                    channel = channel.as_str(),
                    remaining_seconds = remaining,
                    "OTP generation throttled"
                );
                return Err(OtpError::Cooldown {
                    remaining_seconds: remaining,
                }
                .into());
            }
        }

        let superseded = otp_codes
            .expire_pending(account_id, channel, &recipient)
            .await?;
        if superseded > 0 {
            debug!(account_id = %account_id, superseded, "Superseded prior pending codes");
        }

        let record = OtpRecord {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            channel,
            status: OtpStatus::Pending,
            code: generate_numeric_code(self.config.code_length),
            recipient: recipient.clone(),
            attempts: 0,
            created_at: now,
            expires_at: now + Duration::seconds(self.config.ttl_seconds),
            verified_at: None,
        };
        otp_codes.insert(&record).await?;

        let payload = MessagePayload::otp(&record.code, self.config.ttl_seconds);
        if let Err(err) = self.gateway.dispatch(channel.into(), &recipient, &payload).await {
            warn!(
                account_id = %account_id,
                channel = channel.as_str(),
                error = %err,
                "OTP dispatch failed, rolling back record"
            );
            if let Err(delete_err) = otp_codes.delete(&record.id).await {
                warn!(id = %record.id, error = %delete_err, "Rollback delete failed");
            }
            return Err(OtpError::Generation(err.to_string()).into());
        }

        info!(
            account_id = %account_id,
            channel = channel.as_str(),
            expires_at = %record.expires_at,
            "OTP generated and dispatched"
        );

        Ok(record)
    }

    /// Verifies a submitted code against the latest record for the tuple.
    ///
    /// On success the record is marked VERIFIED and returned. Every
    /// rejection surfaces as [`OtpError::Validation`] carrying the
    /// reason; wrong guesses consume an attempt, a correct-but-late code
    /// does not.
    pub async fn verify(
        &self,
        account_id: &str,
        channel: OtpChannel,
        recipient: &str,
        submitted: &str,
    ) -> EngineResult<OtpRecord> {
        let recipient = validate_recipient(channel, recipient)?;

        let lock = self
            .tuple_lock((account_id.to_string(), channel, recipient.clone()))
            .await;
        let _guard = lock.lock().await;

        let otp_codes = self.db.otp_codes();
        let now = Utc::now();

        let Some(record) = otp_codes.find_latest(account_id, channel, &recipient).await? else {
            return Err(OtpError::rejection(VerifyErrorKind::NotFound).into());
        };

        match check_submission(&record, submitted, now, self.config.max_attempts) {
            VerifyOutcome::Accept => {
                otp_codes.mark_verified(&record.id, now).await?;
                info!(
                    account_id = %account_id,
                    channel = channel.as_str(),
                    "OTP verified"
                );
                Ok(OtpRecord {
                    status: OtpStatus::Verified,
                    verified_at: Some(now),
                    ..record
                })
            }

            VerifyOutcome::Reject(kind) => Err(OtpError::rejection(kind).into()),

            VerifyOutcome::RejectAndFail(kind) => {
                // Both late and exhausted records land in FAILED; EXPIRED
                // is reserved for superseded codes.
                otp_codes.mark_failed(&record.id).await?;
                Err(OtpError::rejection(kind).into())
            }

            VerifyOutcome::WrongCode => {
                let attempts = otp_codes.increment_attempts(&record.id).await?;
                if attempts >= self.config.max_attempts {
                    otp_codes.mark_failed(&record.id).await?;
                    warn!(
                        account_id = %account_id,
                        channel = channel.as_str(),
                        attempts,
                        "OTP record failed: attempt limit reached"
                    );
                    return Err(OtpError::rejection(VerifyErrorKind::MaxAttemptsExceeded).into());
                }
                Err(OtpError::rejection(VerifyErrorKind::CodeMismatch {
                    remaining: self.config.max_attempts - attempts,
                })
                .into())
            }
        }
    }

    /// Janitor sweep: transitions PENDING records past their TTL to
    /// EXPIRED. Returns the number of rows touched. Correctness does not
    /// depend on this running; expiry is re-checked at verification time.
    pub async fn expire_stale(&self) -> EngineResult<u64> {
        let touched = self.db.otp_codes().expire_stale(Utc::now()).await?;
        if touched > 0 {
            debug!(touched, "Expired stale OTP records");
        }
        Ok(touched)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
