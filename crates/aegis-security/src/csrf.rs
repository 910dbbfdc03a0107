//! CSRF token issuance and verification (spec §4.4.1).
//!
//! Tokens are 16 cryptographically random bytes, hex-encoded, stored on a
//! caller-provided [`CsrfSession`] alongside an expiration instant.
//! Verification is constant-time in the length of the presented token so
//! that a timing side-channel cannot leak how many leading bytes matched.

use aegis_core::config;
use aegis_core::{Error, ErrorKind};
use rand::RngCore;
use std::time::{Duration, SystemTime};

/// The token bytes, 16 of them per spec §3.
const TOKEN_BYTES: usize = 16;

/// The session slot a CSRF token is stored in. The session object itself
/// (cookie-backed, Redis-backed, whatever) is the caller's responsibility;
/// this crate only reads and writes the two fields it needs.
pub trait CsrfSession {
    /// The currently bound token, if any, and its expiration instant.
    fn csrf_token(&self) -> Option<(&str, SystemTime)>;

    /// Binds a freshly issued token and its expiration instant.
    fn set_csrf_token(&mut self, token: String, expiry: SystemTime);
}

/// A minimal in-memory [`CsrfSession`] for callers that don't already have
/// a session type — most applications implement the trait on their own
/// session struct instead.
#[derive(Debug, Default, Clone)]
pub struct MemorySession {
    token: Option<String>,
    expiry: Option<SystemTime>,
}

impl CsrfSession for MemorySession {
    fn csrf_token(&self) -> Option<(&str, SystemTime)> {
        match (&self.token, self.expiry) {
            (Some(token), Some(expiry)) => Some((token.as_str(), expiry)),
            _ => None,
        }
    }

    fn set_csrf_token(&mut self, token: String, expiry: SystemTime) {
        self.token = Some(token);
        self.expiry = Some(expiry);
    }
}

/// Resolved CSRF configuration (spec §6.1: `CSRF_SECRET`, `CSRF_TOKEN_FIELD`,
/// `CSRF_HEADER_FIELD`, `CSRF_EXPIRY_MIN`).
///
/// `secret` is carried for API symmetry with the source system's
/// configuration surface, but issuance/verification here rely only on a
/// per-session random token — `secret` exists so a deployment that wants
/// to mix in a pepper or rotate secrets has a documented place to do it.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    pub secret: String,
    pub token_field: String,
    pub header_field: String,
    pub default_expiry: Duration,
}

impl CsrfConfig {
    /// Resolves configuration with explicit-argument > environment-variable
    /// > built-in-default precedence. Fails with [`ErrorKind::Configuration`]
    /// if `CSRF_SECRET` cannot be resolved, per spec §6.1 ("required for
    /// CSRF").
    pub fn resolve(secret: Option<String>) -> Result<Self, Error> {
        let secret = config::resolve_required_string(secret, "CSRF_SECRET").ok_or_else(|| {
            Error::new(
                ErrorKind::Configuration,
                "CSRF_SECRET is required to construct CSRF primitives",
            )
        })?;

        let token_field = config::resolve(None, "CSRF_TOKEN_FIELD", "_csrf".to_string());
        let header_field = config::resolve(None, "CSRF_HEADER_FIELD", "x-csrf-token".to_string());
        let expiry_min: u64 = config::resolve(None, "CSRF_EXPIRY_MIN", 60);

        Ok(Self {
            secret,
            token_field,
            header_field,
            default_expiry: Duration::from_secs(expiry_min * 60),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            secret: "test-secret".to_string(),
            token_field: "_csrf".to_string(),
            header_field: "x-csrf-token".to_string(),
            default_expiry: Duration::from_secs(3600),
        }
    }
}

/// Issues a new token, binding it to `session` with the given expiry, and
/// returns the hex-encoded token to hand to the client.
pub fn issue_token(session: &mut dyn CsrfSession, expiry: Duration) -> String {
    let mut raw = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut raw);
    let token = hex::encode(raw);

    let expires_at = SystemTime::now() + expiry;
    session.set_csrf_token(token.clone(), expires_at);
    token
}

/// Verifies `presented` against the token bound to `session`.
///
/// Returns `false` — never an error — for every failure mode named in
/// spec §4.4.1: absent binding, empty or non-hex input, length mismatch,
/// or expiry. Only a length-matched, still-valid pair reaches the
/// constant-time comparison.
pub fn verify_token(presented: &str, session: &dyn CsrfSession) -> bool {
    if presented.is_empty() {
        return false;
    }

    let Some(presented_bytes) = hex::decode(presented).ok() else {
        return false;
    };

    let Some((bound_hex, expires_at)) = session.csrf_token() else {
        return false;
    };

    if SystemTime::now() > expires_at {
        return false;
    }

    let Ok(bound_bytes) = hex::decode(bound_hex) else {
        return false;
    };

    if bound_bytes.len() != presented_bytes.len() {
        return false;
    }

    constant_time_eq(&bound_bytes, &presented_bytes)
}

/// Byte-wise constant-time comparison: every byte pair is compared
/// regardless of earlier mismatches, so runtime does not correlate with
/// the position of the first differing byte (spec §8 invariant 10).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trips() {
        let mut session = MemorySession::default();
        let token = issue_token(&mut session, Duration::from_secs(3600));
        assert!(verify_token(&token, &session));
    }

    #[test]
    fn issued_token_is_32_hex_chars_for_16_random_bytes() {
        let mut session = MemorySession::default();
        let token = issue_token(&mut session, Duration::from_secs(60));
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tampered_token_fails_verification() {
        let mut session = MemorySession::default();
        let token = issue_token(&mut session, Duration::from_secs(3600));
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        let flipped = if last == '0' { '1' } else { '0' };
        tampered.push(flipped);
        assert!(!verify_token(&tampered, &session));
    }

    #[test]
    fn absent_binding_fails_verification() {
        let session = MemorySession::default();
        assert!(!verify_token("deadbeef", &session));
    }

    #[test]
    fn empty_presented_token_fails() {
        let mut session = MemorySession::default();
        issue_token(&mut session, Duration::from_secs(60));
        assert!(!verify_token("", &session));
    }

    #[test]
    fn non_hex_presented_token_fails() {
        let mut session = MemorySession::default();
        issue_token(&mut session, Duration::from_secs(60));
        assert!(!verify_token("not-hex-at-all!!", &session));
    }

    #[test]
    fn expired_token_fails_verification() {
        let mut session = MemorySession::default();
        let token = issue_token(&mut session, Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!verify_token(&token, &session));
    }

    #[test]
    fn mismatched_length_fails_without_panicking() {
        let mut session = MemorySession::default();
        issue_token(&mut session, Duration::from_secs(60));
        assert!(!verify_token("ab", &session));
    }

    #[test]
    fn constant_time_eq_rejects_any_single_byte_difference() {
        let a = [1u8, 2, 3, 4];
        let mut b = a;
        b[2] = 9;
        assert!(!constant_time_eq(&a, &b));
        assert!(constant_time_eq(&a, &a));
    }
}
