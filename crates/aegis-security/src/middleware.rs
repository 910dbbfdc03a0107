//! `csrfMiddleware` (spec §4.4.1): extracts a presented token from the
//! request, verifies it against the session, and tells the caller's
//! framework integration whether to continue or terminate the response.

use crate::csrf::{verify_token, CsrfConfig, CsrfSession};
use aegis_core::http::{ErrorResponseBody, HttpRequest, MiddlewareOutcome};

const SAFE_METHODS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];

/// Runs the CSRF check for one request.
///
/// - Safe methods (`GET`, `HEAD`, `OPTIONS`) are always allowed through.
/// - The token is read, in order, from the request body (`token_field`),
///   the request header (`header_field`, case-insensitive), then the
///   query string (`token_field`).
/// - `session` being `None` is a misconfiguration (no session middleware
///   installed upstream) and fails with 500, not 403.
pub fn csrf_middleware<R: HttpRequest>(
    req: &R,
    session: Option<&dyn CsrfSession>,
    config: &CsrfConfig,
) -> MiddlewareOutcome {
    if SAFE_METHODS.iter().any(|m| m.eq_ignore_ascii_case(req.method())) {
        return MiddlewareOutcome::Continue;
    }

    let Some(session) = session else {
        return MiddlewareOutcome::Reject {
            status: 500,
            body: ErrorResponseBody {
                error: "configuration",
                message: "no session available for CSRF verification".to_string(),
                details: None,
            },
        };
    };

    let presented = req
        .body_field(&config.token_field)
        .or_else(|| req.header(&config.header_field))
        .or_else(|| req.query(&config.token_field))
        .unwrap_or("");

    if verify_token(presented, session) {
        MiddlewareOutcome::Continue
    } else {
        MiddlewareOutcome::Reject {
            status: 403,
            body: ErrorResponseBody {
                error: "forbidden",
                message: "CSRF token missing or invalid".to_string(),
                details: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csrf::{issue_token, MemorySession};
    use aegis_core::http::TestRequest;
    use std::time::Duration;

    fn config() -> CsrfConfig {
        CsrfConfig::for_tests()
    }

    #[test]
    fn get_requests_skip_csrf_entirely() {
        let req = TestRequest {
            method: "GET".to_string(),
            ..Default::default()
        };
        let outcome = csrf_middleware(&req, None, &config());
        assert!(matches!(outcome, MiddlewareOutcome::Continue));
    }

    #[test]
    fn lowercase_safe_method_still_skips_csrf() {
        let req = TestRequest {
            method: "get".to_string(),
            ..Default::default()
        };
        let outcome = csrf_middleware(&req, None, &config());
        assert!(matches!(outcome, MiddlewareOutcome::Continue));
    }

    #[test]
    fn missing_session_fails_with_500() {
        let req = TestRequest {
            method: "POST".to_string(),
            ..Default::default()
        };
        let outcome = csrf_middleware(&req, None, &config());
        match outcome {
            MiddlewareOutcome::Reject { status, .. } => assert_eq!(status, 500),
            _ => panic!("expected reject"),
        }
    }

    #[test]
    fn valid_body_token_continues() {
        let mut session = MemorySession::default();
        let token = issue_token(&mut session, Duration::from_secs(3600));

        let mut req = TestRequest {
            method: "POST".to_string(),
            ..Default::default()
        };
        req.body.insert("_csrf".to_string(), token);

        let outcome = csrf_middleware(&req, Some(&session), &config());
        assert!(matches!(outcome, MiddlewareOutcome::Continue));
    }

    #[test]
    fn valid_header_token_continues() {
        let mut session = MemorySession::default();
        let token = issue_token(&mut session, Duration::from_secs(3600));

        let mut req = TestRequest {
            method: "POST".to_string(),
            ..Default::default()
        };
        req.headers.insert("x-csrf-token".to_string(), token);

        let outcome = csrf_middleware(&req, Some(&session), &config());
        assert!(matches!(outcome, MiddlewareOutcome::Continue));
    }

    #[test]
    fn invalid_token_fails_with_403() {
        let mut session = MemorySession::default();
        issue_token(&mut session, Duration::from_secs(3600));

        let mut req = TestRequest {
            method: "POST".to_string(),
            ..Default::default()
        };
        req.body.insert("_csrf".to_string(), "0".repeat(32));

        let outcome = csrf_middleware(&req, Some(&session), &config());
        match outcome {
            MiddlewareOutcome::Reject { status, .. } => assert_eq!(status, 403),
            _ => panic!("expected reject"),
        }
    }
}
