//! # Authentication
//!
//! Session tokens, password verification, and the account-facing login
//! flows that tie them to the OTP engine.
//!
//! ## Login Paths
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            AuthFlow                                  │
//! │                                                                      │
//! │  OTP login                         Password login                    │
//! │  ──────────                        ──────────────                    │
//! │  start_otp_login(identifier)       authenticate_password(id, pw)     │
//! │    └─ find-or-create account         └─ resolve account              │
//! │    └─ generate + dispatch code       └─ argon2 verify                │
//! │  complete_otp_login(id, code)           (dummy hash when no          │
//! │    └─ verify code                        account: constant-ish       │
//! │    └─ activate + mark verified           timing, no enumeration)     │
//! │    └─ issue token pair               └─ issue token pair             │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Password reset is OTP-backed and deliberately quiet: an unknown
//! identifier or a dispatch failure is logged and swallowed, so the
//! endpoint's response never reveals whether an account exists.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bazaar_core::validation::{classify_identifier, IdentifierKind};
use bazaar_core::{Account, OtpChannel};
use bazaar_db::Database;

use crate::error::{EngineError, EngineResult};
use crate::otp_engine::OtpEngine;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by token handling and password hashing.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token creation failed (key/claims problem).
    #[error("Failed to create token: {0}")]
    TokenCreation(String),

    /// Token failed signature or claims validation.
    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    /// A token of the wrong type was presented (refresh where access is
    /// expected, or vice versa).
    #[error("Wrong token type: expected {expected}")]
    WrongTokenType { expected: &'static str },

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

// =============================================================================
// Token Issuer
// =============================================================================

/// Token issuer configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC secret for HS256 signing.
    pub secret: String,

    /// Access token lifetime in seconds. Default: 900 (15 minutes).
    pub access_lifetime_secs: i64,

    /// Refresh token lifetime in seconds. Default: 1209600 (14 days).
    pub refresh_lifetime_secs: i64,
}

impl TokenConfig {
    /// Creates a configuration with the given secret and default
    /// lifetimes.
    pub fn new(secret: impl Into<String>) -> Self {
        TokenConfig {
            secret: secret.into(),
            access_lifetime_secs: 900,
            refresh_lifetime_secs: 14 * 24 * 3600,
        }
    }

    /// Loads from the environment:
    /// - `BAZAAR_JWT_SECRET` (required)
    /// - `BAZAAR_JWT_ACCESS_LIFETIME_SECS` (optional)
    /// - `BAZAAR_JWT_REFRESH_LIFETIME_SECS` (optional)
    pub fn from_env() -> Result<Self, AuthError> {
        let secret = std::env::var("BAZAAR_JWT_SECRET")
            .map_err(|_| AuthError::TokenCreation("BAZAAR_JWT_SECRET is not set".to_string()))?;

        let mut config = TokenConfig::new(secret);
        if let Ok(secs) = std::env::var("BAZAAR_JWT_ACCESS_LIFETIME_SECS") {
            if let Ok(parsed) = secs.parse() {
                config.access_lifetime_secs = parsed;
            }
        }
        if let Ok(secs) = std::env::var("BAZAAR_JWT_REFRESH_LIFETIME_SECS") {
            if let Ok(parsed) = secs.parse() {
                config.refresh_lifetime_secs = parsed;
            }
        }
        Ok(config)
    }
}

/// JWT claims carried by both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID.
    pub sub: String,

    /// "access" or "refresh".
    pub token_type: String,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiry (unix seconds).
    pub exp: i64,

    /// Unique token ID.
    pub jti: String,
}

/// An access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Issues and validates HS256 session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime_secs: i64,
    refresh_lifetime_secs: i64,
}

impl TokenIssuer {
    /// Creates a token issuer from a configuration.
    pub fn new(config: &TokenConfig) -> Self {
        TokenIssuer {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_lifetime_secs: config.access_lifetime_secs,
            refresh_lifetime_secs: config.refresh_lifetime_secs,
        }
    }

    /// Issues a fresh access/refresh pair for an account.
    pub fn issue(&self, account_id: &str) -> Result<TokenPair, AuthError> {
        let access = self.sign(account_id, "access", self.access_lifetime_secs)?;
        let refresh = self.sign(account_id, "refresh", self.refresh_lifetime_secs)?;
        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
            expires_in: self.access_lifetime_secs,
        })
    }

    /// Validates an access token and returns its claims.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate(token, "access")
    }

    /// Exchanges a refresh token for a fresh pair.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate(refresh_token, "refresh")?;
        self.issue(&claims.sub)
    }

    fn sign(&self, account_id: &str, token_type: &str, lifetime_secs: i64) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account_id.to_string(),
            token_type: token_type.to_string(),
            iat: now,
            exp: now + lifetime_secs,
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    fn validate(&self, token: &str, expected_type: &'static str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AuthError::TokenInvalid(e.to_string()))?;

        if data.claims.token_type != expected_type {
            return Err(AuthError::WrongTokenType {
                expected: expected_type,
            });
        }
        Ok(data.claims)
    }
}

// =============================================================================
// Password Verification
// =============================================================================

/// Argon2 password hashing and verification.
pub struct PasswordAuth {
    argon2: Argon2<'static>,

    /// Hash of a throwaway password, verified against when no account
    /// matches an identifier so both paths cost one argon2 run.
    dummy_hash: String,
}

impl PasswordAuth {
    /// Creates a password verifier with default argon2id parameters.
    pub fn new() -> Result<Self, AuthError> {
        let argon2 = Argon2::default();
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"timing-equalizer", &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .to_string();
        Ok(PasswordAuth { argon2, dummy_hash })
    }

    /// Hashes a password for storage.
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .to_string())
    }

    /// Verifies a password against a stored hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burns one argon2 verification so the no-such-account path takes
    /// as long as the wrong-password path.
    pub fn burn_verification(&self, password: &str) {
        let _ = self.verify_password(password, &self.dummy_hash);
    }
}

// =============================================================================
// Auth Flow
// =============================================================================

/// Account-facing login, reset, and session flows.
pub struct AuthFlow {
    db: Database,
    otp: Arc<OtpEngine>,
    tokens: TokenIssuer,
    passwords: PasswordAuth,
}

impl AuthFlow {
    /// Creates the auth flow over a database, OTP engine, and token
    /// issuer.
    pub fn new(db: Database, otp: Arc<OtpEngine>, tokens: TokenIssuer) -> Result<Self, AuthError> {
        Ok(AuthFlow {
            db,
            otp,
            tokens,
            passwords: PasswordAuth::new()?,
        })
    }

    /// The token issuer, for validating tokens on authenticated calls.
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Starts an OTP login: resolves (or, for phone identifiers, creates)
    /// the account and dispatches a code to the identifier.
    ///
    /// Phone-first registration: an unknown phone number creates an
    /// inactive account on the spot; an unknown email is rejected, since
    /// email is only ever a secondary identifier.
    pub async fn start_otp_login(&self, identifier: &str) -> EngineResult<Account> {
        let (kind, normalized) = classify_identifier(identifier)?;
        let accounts = self.db.accounts();

        let account = match accounts.find_by_identifier(&normalized).await? {
            Some(account) => account,
            None => match kind {
                IdentifierKind::Phone => {
                    let now = Utc::now();
                    let account = Account {
                        id: Uuid::new_v4().to_string(),
                        phone: normalized.clone(),
                        email: None,
                        is_phone_verified: false,
                        is_email_verified: false,
                        is_active: false,
                        password_hash: None,
                        created_at: now,
                        updated_at: now,
                    };
                    accounts.insert(&account).await?;
                    info!(account_id = %account.id, "Created account for first-time login");
                    account
                }
                IdentifierKind::Email => {
                    return Err(EngineError::InvalidCredentials);
                }
            },
        };

        let channel = channel_for(kind);
        self.otp
            .generate_and_send(&account.id, channel, &normalized)
            .await?;
        Ok(account)
    }

    /// Completes an OTP login: verifies the code, activates the account
    /// and marks the channel's identifier verified, then issues tokens.
    pub async fn complete_otp_login(
        &self,
        identifier: &str,
        code: &str,
    ) -> EngineResult<(Account, TokenPair)> {
        let (kind, normalized) = classify_identifier(identifier)?;
        let accounts = self.db.accounts();

        let account = accounts
            .find_by_identifier(&normalized)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;

        let channel = channel_for(kind);
        self.otp
            .verify(&account.id, channel, &normalized, code)
            .await?;

        accounts
            .mark_channel_verified(&account.id, channel, Utc::now())
            .await?;
        let account = accounts.get_by_id(&account.id).await?;

        let pair = self.tokens.issue(&account.id)?;
        info!(account_id = %account.id, channel = channel.as_str(), "OTP login completed");
        Ok((account, pair))
    }

    /// Password login against phone or verified email.
    ///
    /// Every failure is [`EngineError::InvalidCredentials`]; no-account,
    /// no-password and wrong-password all cost one argon2 run and are
    /// indistinguishable to the caller.
    pub async fn authenticate_password(
        &self,
        identifier: &str,
        password: &str,
    ) -> EngineResult<(Account, TokenPair)> {
        let Ok((_, normalized)) = classify_identifier(identifier) else {
            self.passwords.burn_verification(password);
            return Err(EngineError::InvalidCredentials);
        };

        let account = self.db.accounts().find_by_identifier(&normalized).await?;

        let Some(account) = account else {
            self.passwords.burn_verification(password);
            return Err(EngineError::InvalidCredentials);
        };
        let Some(hash) = account.password_hash.as_deref() else {
            self.passwords.burn_verification(password);
            return Err(EngineError::InvalidCredentials);
        };

        if !self.passwords.verify_password(password, hash) || !account.is_active {
            return Err(EngineError::InvalidCredentials);
        }

        let pair = self.tokens.issue(&account.id)?;
        debug!(account_id = %account.id, "Password login");
        Ok((account, pair))
    }

    /// Exchanges a refresh token for a fresh pair, checking the account
    /// still exists and is active.
    pub async fn refresh_session(&self, refresh_token: &str) -> EngineResult<TokenPair> {
        let pair = self.tokens.refresh(refresh_token)?;
        let claims = self.tokens.validate_access_token(&pair.access_token)?;

        let account = self.db.accounts().get_by_id(&claims.sub).await?;
        if !account.is_active {
            return Err(EngineError::InvalidCredentials);
        }
        Ok(pair)
    }

    /// Dispatches a password-reset code, best-effort.
    ///
    /// Always returns Ok: an unknown identifier or a dispatch failure is
    /// logged and swallowed so the response never reveals whether an
    /// account exists.
    pub async fn request_password_reset(&self, identifier: &str) -> EngineResult<()> {
        let (kind, normalized) = match classify_identifier(identifier) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(error = %err, "Password reset for malformed identifier ignored");
                return Ok(());
            }
        };

        let account = match self.db.accounts().find_by_identifier(&normalized).await? {
            Some(account) => account,
            None => {
                debug!("Password reset for unknown identifier ignored");
                return Ok(());
            }
        };

        if let Err(err) = self
            .otp
            .generate_and_send(&account.id, channel_for(kind), &normalized)
            .await
        {
            warn!(account_id = %account.id, error = %err, "Password reset dispatch failed");
        }
        Ok(())
    }

    /// Confirms a password reset: verifies the code, then stores the new
    /// password hash.
    pub async fn confirm_password_reset(
        &self,
        identifier: &str,
        code: &str,
        new_password: &str,
    ) -> EngineResult<()> {
        let (kind, normalized) = classify_identifier(identifier)?;

        let account = self
            .db
            .accounts()
            .find_by_identifier(&normalized)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;

        self.otp
            .verify(&account.id, channel_for(kind), &normalized, code)
            .await?;

        let hash = self.passwords.hash_password(new_password)?;
        self.db
            .accounts()
            .set_password_hash(&account.id, Some(&hash), Utc::now())
            .await?;

        info!(account_id = %account.id, "Password reset completed");
        Ok(())
    }
}

/// OTP channel matching an identifier kind.
fn channel_for(kind: IdentifierKind) -> OtpChannel {
    match kind {
        IdentifierKind::Phone => OtpChannel::Sms,
        IdentifierKind::Email => OtpChannel::Email,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationGateway;
    use bazaar_core::{OtpConfig, OtpError};
    use bazaar_db::DbConfig;

    const PHONE: &str = "+15550001111";

    async fn flow() -> AuthFlow {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let otp = Arc::new(OtpEngine::new(
            db.clone(),
            Arc::new(NotificationGateway::console()),
            OtpConfig::default().cooldown_seconds(0),
        ));
        AuthFlow::new(db, otp, TokenIssuer::new(&TokenConfig::new("test-secret"))).unwrap()
    }

    async fn latest_code(flow: &AuthFlow, account_id: &str) -> String {
        flow.db
            .otp_codes()
            .find_latest(account_id, OtpChannel::Sms, PHONE)
            .await
            .unwrap()
            .unwrap()
            .code
    }

    #[tokio::test]
    async fn test_first_phone_login_creates_and_activates_account() {
        let flow = flow().await;

        let account = flow.start_otp_login("+1 (555) 000-1111").await.unwrap();
        assert_eq!(account.phone, PHONE);
        assert!(!account.is_active);

        let code = latest_code(&flow, &account.id).await;
        let (account, pair) = flow.complete_otp_login(PHONE, &code).await.unwrap();

        assert!(account.is_active);
        assert!(account.is_phone_verified);

        let claims = flow.tokens().validate_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.token_type, "access");
    }

    #[tokio::test]
    async fn test_unknown_email_cannot_start_login() {
        let flow = flow().await;
        let err = flow.start_otp_login("ghost@example.com").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let flow = flow().await;

        flow.start_otp_login(PHONE).await.unwrap();
        let account = flow.db.accounts().find_by_identifier(PHONE).await.unwrap().unwrap();
        let code = latest_code(&flow, &account.id).await;
        let (_, pair) = flow.complete_otp_login(PHONE, &code).await.unwrap();

        let err = flow
            .tokens()
            .validate_access_token(&pair.refresh_token)
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongTokenType { expected: "access" }));

        // But it does refresh.
        let fresh = flow.refresh_session(&pair.refresh_token).await.unwrap();
        assert!(flow.tokens().validate_access_token(&fresh.access_token).is_ok());
    }

    #[tokio::test]
    async fn test_password_login_round_trip() {
        let flow = flow().await;

        flow.start_otp_login(PHONE).await.unwrap();
        let account = flow.db.accounts().find_by_identifier(PHONE).await.unwrap().unwrap();
        let code = latest_code(&flow, &account.id).await;
        flow.complete_otp_login(PHONE, &code).await.unwrap();

        let hash = flow.passwords.hash_password("hunter2!").unwrap();
        flow.db
            .accounts()
            .set_password_hash(&account.id, Some(&hash), Utc::now())
            .await
            .unwrap();

        let (logged_in, _) = flow.authenticate_password(PHONE, "hunter2!").await.unwrap();
        assert_eq!(logged_in.id, account.id);

        let err = flow.authenticate_password(PHONE, "wrong").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_password_login_unknown_identifier_is_generic() {
        let flow = flow().await;
        let err = flow
            .authenticate_password("+15559998888", "whatever")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_password_reset_is_quiet_for_unknown_identifier() {
        let flow = flow().await;
        // Unknown and malformed identifiers both succeed silently.
        flow.request_password_reset("+15559998888").await.unwrap();
        flow.request_password_reset("not an identifier").await.unwrap();
    }

    #[tokio::test]
    async fn test_password_reset_round_trip() {
        let flow = flow().await;

        flow.start_otp_login(PHONE).await.unwrap();
        let account = flow.db.accounts().find_by_identifier(PHONE).await.unwrap().unwrap();
        let code = latest_code(&flow, &account.id).await;
        flow.complete_otp_login(PHONE, &code).await.unwrap();

        flow.request_password_reset(PHONE).await.unwrap();
        let code = latest_code(&flow, &account.id).await;
        flow.confirm_password_reset(PHONE, &code, "new-pass-123")
            .await
            .unwrap();

        flow.authenticate_password(PHONE, "new-pass-123").await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_with_wrong_code_rejected() {
        let flow = flow().await;

        flow.start_otp_login(PHONE).await.unwrap();
        let account = flow.db.accounts().find_by_identifier(PHONE).await.unwrap().unwrap();
        let code = latest_code(&flow, &account.id).await;
        flow.complete_otp_login(PHONE, &code).await.unwrap();

        flow.request_password_reset(PHONE).await.unwrap();
        let real = latest_code(&flow, &account.id).await;
        let wrong = if real == "000000" { "111111" } else { "000000" };

        let err = flow
            .confirm_password_reset(PHONE, wrong, "new-pass-123")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Otp(OtpError::Validation(_))));
    }
}
