//! CSRF token issuance/verification, input/HTML sanitization, and
//! AES-256-GCM authenticated encryption (spec §4.4).
//!
//! Each of the three primitives is independent — there is no shared
//! state between `csrf`, `sanitize`, and `encryption` — so this crate is
//! really three small modules that happen to ship together because the
//! source system grouped them as "security primitives".
//!
//! ```
//! use aegis_security::csrf::{issue_token, verify_token, MemorySession};
//! use std::time::Duration;
//!
//! let mut session = MemorySession::default();
//! let token = issue_token(&mut session, Duration::from_secs(3600));
//! assert!(verify_token(&token, &session));
//! ```

pub mod csrf;
pub mod encryption;
pub mod middleware;
pub mod sanitize;

pub use csrf::{issue_token, verify_token, CsrfConfig, CsrfSession, MemorySession};
pub use encryption::{decrypt, encrypt, generate_key, EncryptionConfig};
pub use middleware::csrf_middleware;
pub use sanitize::{clean_html, clean_text, escape_html, CleanHtmlOptions, CleanTextOptions, SanitizeConfig};
