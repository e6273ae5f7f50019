//! # Account Repository
//!
//! Database operations for customer accounts.
//!
//! ## Identifier Resolution
//! Accounts are keyed by phone number; email is a secondary identifier
//! that only resolves once the account has verified it. Lookup by raw
//! identifier therefore matches `phone = ?` unconditionally but
//! `email = ?` only where `is_email_verified = 1` so an unverified email
//! claim can never be used to log into someone else's account.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::{Account, OtpChannel};

/// Columns selected into [`Account`].
const ACCOUNT_COLUMNS: &str = "id, phone, email, is_phone_verified, is_email_verified, \
     is_active, password_hash, created_at, updated_at";

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Inserts a new account.
    pub async fn insert(&self, account: &Account) -> DbResult<()> {
        debug!(id = %account.id, "Inserting account");

        sqlx::query(
            "INSERT INTO accounts (
                id, phone, email, is_phone_verified, is_email_verified,
                is_active, password_hash, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&account.id)
        .bind(&account.phone)
        .bind(&account.email)
        .bind(account.is_phone_verified)
        .bind(account.is_email_verified)
        .bind(account.is_active)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches an account by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Account> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Account", id))
    }

    /// Fetches an account by phone number (the primary identifier).
    pub async fn find_by_phone(&self, phone: &str) -> DbResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE phone = ?1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Resolves a normalized identifier to an account: phone matches
    /// directly, email only where the account has verified it.
    pub async fn find_by_identifier(&self, identifier: &str) -> DbResult<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE phone = ?1 OR (email = ?1 AND is_email_verified = 1) \
             LIMIT 1"
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Flags the channel's identifier as verified and activates the
    /// account. Called after a successful OTP verification.
    pub async fn mark_channel_verified(
        &self,
        id: &str,
        channel: OtpChannel,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let column = match channel {
            OtpChannel::Sms => "is_phone_verified",
            OtpChannel::Email => "is_email_verified",
        };
        let sql = format!(
            "UPDATE accounts SET {column} = 1, is_active = 1, updated_at = ?2 WHERE id = ?1"
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }

        Ok(())
    }

    /// Stores a new password hash (or clears it with `None`).
    pub async fn set_password_hash(
        &self,
        id: &str,
        password_hash: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE accounts SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(password_hash)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }

        Ok(())
    }

    /// Attaches an email address to an account, unverified until an OTP
    /// on the email channel confirms it.
    pub async fn set_email(&self, id: &str, email: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET email = ?2, is_email_verified = 0, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(email)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
