//! Shared runtime for `aegis`: errors, config resolution, the JSON
//! serializer, and the event system.
//!
//! Every other crate in the workspace (`aegis-cache`, `aegis-queue`,
//! `aegis-ratelimiter`, `aegis-security`) depends on this crate for:
//! - a single typed [`Error`] enum with stable identifiers and HTTP-style
//!   status codes
//! - [`config`] helpers that resolve settings with explicit-argument >
//!   environment-variable > built-in-default precedence
//! - [`Serializer`]/[`JsonSerializer`] for pluggable value encoding
//! - [`events`], an observability registry each subsystem plugs its own
//!   event enum into

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod serializer;
pub mod tenant;

pub use error::{Error, ErrorKind};
pub use events::{AegisEvent, EventListener, EventListeners, FnListener};
pub use http::{ErrorResponseBody, HttpRequest, HttpResponse, MiddlewareOutcome};
pub use serializer::{JsonSerializer, Serializer};
pub use tenant::TenantRouter;
