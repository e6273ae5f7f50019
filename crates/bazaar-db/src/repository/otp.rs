//! # OTP Repository
//!
//! Database operations for OTP records.
//!
//! ## Record Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       OTP Record Lifecycle                              │
//! │                                                                         │
//! │  1. GENERATE                                                           │
//! │     └── expire_pending() → prior PENDING rows become EXPIRED           │
//! │     └── insert()         → new row, status PENDING                     │
//! │                                                                         │
//! │  2. VERIFY                                                             │
//! │     └── find_latest()        → newest row for the tuple                │
//! │     └── increment_attempts() → single-statement counter bump           │
//! │     └── mark_verified() / mark_failed()                                │
//! │                                                                         │
//! │  3. ROLLBACK (dispatch failed)                                         │
//! │     └── delete() → the only path that removes a row                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status-guarded UPDATEs (`WHERE status = 'pending'`) make terminal states
//! sticky at the SQL level: a VERIFIED/EXPIRED/FAILED row never transitions
//! again even if two calls race.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use bazaar_core::{OtpChannel, OtpRecord, OtpStatus};

/// Columns selected into [`OtpRecord`].
const OTP_COLUMNS: &str =
    "id, account_id, channel, status, code, recipient, attempts, created_at, expires_at, verified_at";

/// Repository for OTP database operations.
#[derive(Debug, Clone)]
pub struct OtpRepository {
    pool: SqlitePool,
}

impl OtpRepository {
    /// Creates a new OtpRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OtpRepository { pool }
    }

    /// The most recent record for a (account, channel, recipient) tuple,
    /// regardless of status.
    pub async fn find_latest(
        &self,
        account_id: &str,
        channel: OtpChannel,
        recipient: &str,
    ) -> DbResult<Option<OtpRecord>> {
        let sql = format!(
            "SELECT {OTP_COLUMNS} FROM otp_codes \
             WHERE account_id = ?1 AND channel = ?2 AND recipient = ?3 \
             ORDER BY created_at DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, OtpRecord>(&sql)
            .bind(account_id)
            .bind(channel)
            .bind(recipient)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Inserts a new record.
    pub async fn insert(&self, record: &OtpRecord) -> DbResult<()> {
        debug!(id = %record.id, channel = %record.channel.as_str(), "Inserting OTP record");

        sqlx::query(
            "INSERT INTO otp_codes (
                id, account_id, channel, status, code, recipient,
                attempts, created_at, expires_at, verified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&record.id)
        .bind(&record.account_id)
        .bind(record.channel)
        .bind(record.status)
        .bind(&record.code)
        .bind(&record.recipient)
        .bind(record.attempts)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.verified_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Transitions every PENDING record of the tuple to EXPIRED.
    ///
    /// Called before inserting a fresh code so at most one PENDING record
    /// exists per tuple. Idempotent. Returns the number of superseded rows.
    pub async fn expire_pending(
        &self,
        account_id: &str,
        channel: OtpChannel,
        recipient: &str,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE otp_codes SET status = ?4 \
             WHERE account_id = ?1 AND channel = ?2 AND recipient = ?3 AND status = ?5",
        )
        .bind(account_id)
        .bind(channel)
        .bind(recipient)
        .bind(OtpStatus::Expired)
        .bind(OtpStatus::Pending)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Increments the attempt counter in a single statement and returns
    /// the new count. The counter can never be advanced from a stale read.
    pub async fn increment_attempts(&self, id: &str) -> DbResult<i64> {
        let attempts: Option<i64> = sqlx::query_scalar(
            "UPDATE otp_codes SET attempts = attempts + 1 WHERE id = ?1 RETURNING attempts",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        attempts.ok_or_else(|| DbError::not_found("OtpRecord", id))
    }

    /// Marks a PENDING record VERIFIED and stamps `verified_at`.
    pub async fn mark_verified(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE otp_codes SET status = ?2, verified_at = ?3 WHERE id = ?1 AND status = ?4",
        )
        .bind(id)
        .bind(OtpStatus::Verified)
        .bind(now)
        .bind(OtpStatus::Pending)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OtpRecord (pending)", id));
        }

        Ok(())
    }

    /// Marks a PENDING record FAILED.
    pub async fn mark_failed(&self, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE otp_codes SET status = ?2 WHERE id = ?1 AND status = ?3")
                .bind(id)
                .bind(OtpStatus::Failed)
                .bind(OtpStatus::Pending)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OtpRecord (pending)", id));
        }

        Ok(())
    }

    /// Deletes a record. Only used as send-failure rollback so a failed
    /// dispatch never leaves a phantom cooldown behind.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting OTP record (dispatch rollback)");

        let result = sqlx::query("DELETE FROM otp_codes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OtpRecord", id));
        }

        Ok(())
    }

    /// Janitor: transitions PENDING records whose TTL has elapsed to
    /// EXPIRED. Optional for correctness (expiry is evaluated lazily at
    /// verification time); keeps the table tidy. Returns rows touched.
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result =
            sqlx::query("UPDATE otp_codes SET status = ?1 WHERE status = ?2 AND expires_at < ?3")
                .bind(OtpStatus::Expired)
                .bind(OtpStatus::Pending)
                .bind(now)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Counts PENDING records for a tuple (diagnostics and tests).
    pub async fn count_pending(
        &self,
        account_id: &str,
        channel: OtpChannel,
        recipient: &str,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM otp_codes \
             WHERE account_id = ?1 AND channel = ?2 AND recipient = ?3 AND status = ?4",
        )
        .bind(account_id)
        .bind(channel)
        .bind(recipient)
        .bind(OtpStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Helper to generate a new OTP record ID.
pub fn generate_otp_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
