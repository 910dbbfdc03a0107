//! End-to-end security primitive scenarios (spec §8: CSRF round-trip,
//! encryption tamper detection).

use aegis_security::csrf::{issue_token, verify_token, CsrfConfig, MemorySession};
use aegis_security::encryption::{decrypt, encrypt, generate_key};
use aegis_security::middleware::csrf_middleware;
use aegis_core::http::TestRequest;
use aegis_core::MiddlewareOutcome;
use std::time::Duration;

fn csrf_config() -> CsrfConfig {
    CsrfConfig {
        secret: "integration-test-secret".to_string(),
        token_field: "_csrf".to_string(),
        header_field: "x-csrf-token".to_string(),
        default_expiry: Duration::from_secs(3600),
    }
}

#[test]
fn valid_token_round_trips_tampered_token_is_rejected_get_is_exempt() {
    let config = csrf_config();
    let mut session = MemorySession::default();
    let token = issue_token(&mut session, Duration::from_secs(3600));

    let mut post = TestRequest {
        method: "POST".to_string(),
        ..Default::default()
    };
    post.body.insert("_csrf".to_string(), token.clone());
    assert!(matches!(csrf_middleware(&post, Some(&session), &config), MiddlewareOutcome::Continue));

    let mut last_char = token.chars().last().unwrap();
    last_char = if last_char == '0' { '1' } else { '0' };
    let mut tampered = token[..token.len() - 1].to_string();
    tampered.push(last_char);

    let mut bad_post = TestRequest {
        method: "POST".to_string(),
        ..Default::default()
    };
    bad_post.body.insert("_csrf".to_string(), tampered);
    match csrf_middleware(&bad_post, Some(&session), &config) {
        MiddlewareOutcome::Reject { status, .. } => assert_eq!(status, 403),
        _ => panic!("tampered token should have been rejected"),
    }

    let get = TestRequest {
        method: "GET".to_string(),
        ..Default::default()
    };
    assert!(matches!(csrf_middleware(&get, None, &config), MiddlewareOutcome::Continue));
}

#[test]
fn verify_token_directly_accepts_only_the_bound_token() {
    let mut session = MemorySession::default();
    let token = issue_token(&mut session, Duration::from_secs(60));
    assert!(verify_token(&token, &session));
    assert!(!verify_token("0".repeat(32).as_str(), &session));
}

#[test]
fn encryption_round_trips_and_detects_tampering() {
    let key = hex::decode(generate_key()).unwrap();

    let envelope = encrypt(b"secret", &key, b"user:1").unwrap();
    let plaintext = decrypt(&envelope, &key, b"user:1").unwrap();
    assert_eq!(plaintext, b"secret");

    let mut parts: Vec<String> = envelope.split(':').map(str::to_string).collect();
    let mut iv_bytes = hex::decode(&parts[0]).unwrap();
    iv_bytes[0] ^= 0x01;
    parts[0] = hex::encode(iv_bytes);
    let tampered = parts.join(":");

    let err = decrypt(&tampered, &key, b"user:1").unwrap_err();
    assert_eq!(err.kind(), aegis_core::ErrorKind::AuthenticationFailed);

    let wrong_aad = decrypt(&envelope, &key, b"user:2").unwrap_err();
    assert_eq!(wrong_aad.kind(), aegis_core::ErrorKind::AuthenticationFailed);
}
