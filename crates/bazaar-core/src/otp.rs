//! # OTP Logic
//!
//! Pure pieces of the one-time-password engine: secure code generation,
//! cooldown arithmetic, and the verification state machine as a single
//! decision function.
//!
//! ## Why a Pure Decision Function?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Verification Ordering Rules                           │
//! │                                                                         │
//! │  latest record for (account, channel, recipient)                       │
//! │       │                                                                 │
//! │       ├── status VERIFIED ─────────► Reject(AlreadyUsed)               │
//! │       ├── status EXPIRED/FAILED ───► Reject(NoLongerValid)             │
//! │       ├── now > expires_at ────────► RejectAndFail(Expired)            │
//! │       ├── attempts ≥ max ──────────► RejectAndFail(MaxAttempts)        │
//! │       ├── code mismatch ───────────► WrongCode (increment)             │
//! │       └── match ───────────────────► Accept (mark verified)            │
//! │                                                                         │
//! │  Expiry and exhaustion are checked BEFORE the code comparison: a       │
//! │  correct code submitted too late is rejected and never consumes an     │
//! │  attempt. These rules live here, in one testable function; the         │
//! │  engine only applies the resulting record transition.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::error::VerifyErrorKind;
use crate::types::{OtpRecord, OtpStatus};

// =============================================================================
// Code Generation
// =============================================================================

/// Generates a numeric one-time password of the given length.
///
/// ## Security
/// Uses `rand::rng()`, a cryptographically secure generator reseeded from
/// the OS. Each digit is drawn uniformly over `0..=9`; never use a seeded
/// or weak PRNG here.
pub fn generate_numeric_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

// =============================================================================
// Cooldown Arithmetic
// =============================================================================

/// Seconds left before a new code may be requested for a tuple whose
/// latest record was created at `last_created_at`.
///
/// `cooldown_end = last_created_at + cooldown_seconds`;
/// `remaining = max(0, cooldown_end − now)`, rounded up so a caller told
/// "wait N seconds" never retries one second early.
pub fn cooldown_remaining(
    last_created_at: DateTime<Utc>,
    cooldown_seconds: i64,
    now: DateTime<Utc>,
) -> i64 {
    let cooldown_end = last_created_at + chrono::Duration::seconds(cooldown_seconds);
    let remaining_ms = (cooldown_end - now).num_milliseconds();
    if remaining_ms <= 0 {
        0
    } else {
        // div_ceil is unstable on signed ints; remaining_ms > 0 here, so
        // routing through u64 is lossless.
        (remaining_ms as u64).div_ceil(1000) as i64
    }
}

// =============================================================================
// Verification State Machine
// =============================================================================

/// The record transition a submission demands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Code matched: mark the record VERIFIED.
    Accept,
    /// Rejected without touching the record.
    Reject(VerifyErrorKind),
    /// Rejected, and the record must transition to FAILED.
    RejectAndFail(VerifyErrorKind),
    /// Wrong code: increment the attempt counter. The caller inspects the
    /// incremented count; reaching the maximum forces FAILED.
    WrongCode,
}

/// Evaluates a code submission against the latest OTP record, in the
/// strict order documented in the module header.
///
/// The "no record found" case is the caller's (there is nothing to
/// evaluate). Increments only happen on incorrect guesses: a correct but
/// late code does not consume an attempt.
pub fn check_submission(
    record: &OtpRecord,
    submitted: &str,
    now: DateTime<Utc>,
    max_attempts: i64,
) -> VerifyOutcome {
    match record.status {
        OtpStatus::Verified => return VerifyOutcome::Reject(VerifyErrorKind::AlreadyUsed),
        OtpStatus::Expired | OtpStatus::Failed => {
            return VerifyOutcome::Reject(VerifyErrorKind::NoLongerValid)
        }
        OtpStatus::Pending => {}
    }

    if record.is_expired_at(now) {
        return VerifyOutcome::RejectAndFail(VerifyErrorKind::Expired);
    }

    if record.attempts >= max_attempts {
        return VerifyOutcome::RejectAndFail(VerifyErrorKind::MaxAttemptsExceeded);
    }

    if record.code != submitted {
        return VerifyOutcome::WrongCode;
    }

    VerifyOutcome::Accept
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OtpChannel;
    use chrono::Duration;

    fn record(status: OtpStatus, attempts: i64, expires_in_secs: i64) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            id: "otp-1".to_string(),
            account_id: "acc-1".to_string(),
            channel: OtpChannel::Sms,
            status,
            code: "123456".to_string(),
            recipient: "+15550001111".to_string(),
            attempts,
            created_at: now,
            expires_at: now + Duration::seconds(expires_in_secs),
            verified_at: None,
        }
    }

    #[test]
    fn test_generated_code_shape() {
        for len in [4usize, 6, 8] {
            let code = generate_numeric_code(len);
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_codes_are_not_constant() {
        // 20 draws of 6 digits colliding to one value would mean a broken
        // generator, not bad luck.
        let codes: std::collections::HashSet<String> =
            (0..20).map(|_| generate_numeric_code(6)).collect();
        assert!(codes.len() > 1);
    }

    #[test]
    fn test_cooldown_remaining_counts_down() {
        let now = Utc::now();
        let created = now - Duration::seconds(15);
        let remaining = cooldown_remaining(created, 60, now);
        assert_eq!(remaining, 45);

        let created = now - Duration::seconds(75);
        assert_eq!(cooldown_remaining(created, 60, now), 0);
    }

    #[test]
    fn test_cooldown_remaining_rounds_up() {
        let now = Utc::now();
        let created = now - Duration::milliseconds(500);
        // 59.5s left must report 60, not 59.
        assert_eq!(cooldown_remaining(created, 60, now), 60);
    }

    #[test]
    fn test_accept_on_match() {
        let rec = record(OtpStatus::Pending, 0, 120);
        assert_eq!(
            check_submission(&rec, "123456", Utc::now(), 5),
            VerifyOutcome::Accept
        );
    }

    #[test]
    fn test_already_used_checked_first() {
        let rec = record(OtpStatus::Verified, 0, 120);
        assert_eq!(
            check_submission(&rec, "123456", Utc::now(), 5),
            VerifyOutcome::Reject(VerifyErrorKind::AlreadyUsed)
        );
    }

    #[test]
    fn test_terminal_states_rejected() {
        for status in [OtpStatus::Expired, OtpStatus::Failed] {
            let rec = record(status, 0, 120);
            assert_eq!(
                check_submission(&rec, "123456", Utc::now(), 5),
                VerifyOutcome::Reject(VerifyErrorKind::NoLongerValid)
            );
        }
    }

    #[test]
    fn test_expiry_beats_correct_code() {
        let rec = record(OtpStatus::Pending, 0, -1);
        assert_eq!(
            check_submission(&rec, "123456", Utc::now(), 5),
            VerifyOutcome::RejectAndFail(VerifyErrorKind::Expired)
        );
    }

    #[test]
    fn test_exhaustion_beats_correct_code() {
        // attempts == max: reject immediately, no further increment.
        let rec = record(OtpStatus::Pending, 5, 120);
        assert_eq!(
            check_submission(&rec, "123456", Utc::now(), 5),
            VerifyOutcome::RejectAndFail(VerifyErrorKind::MaxAttemptsExceeded)
        );
    }

    #[test]
    fn test_one_before_limit_still_succeeds() {
        let rec = record(OtpStatus::Pending, 4, 120);
        assert_eq!(
            check_submission(&rec, "123456", Utc::now(), 5),
            VerifyOutcome::Accept
        );
    }

    #[test]
    fn test_wrong_code_increments() {
        let rec = record(OtpStatus::Pending, 2, 120);
        assert_eq!(
            check_submission(&rec, "000000", Utc::now(), 5),
            VerifyOutcome::WrongCode
        );
    }
}
