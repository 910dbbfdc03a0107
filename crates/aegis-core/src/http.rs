//! The generic HTTP integration contract (spec §6.3) shared by the rate
//! limiter and CSRF middleware.
//!
//! Neither subsystem assumes a specific web framework. Instead each
//! consumes a request exposing `method`, `headers`, `body`, `query`, `ip`,
//! and a session accessor, and a response exposing header-setting and
//! status+body termination, then invokes a `next` continuation on success.
//! An application wires its framework's real request/response types to
//! these traits once, at the edge, the way the source system's Express
//! middleware reads `req`/`res` without knowing what's upstream of them.

use std::collections::HashMap;

/// A read-only view over an inbound HTTP request.
pub trait HttpRequest {
    /// The HTTP method, upper-case (`"GET"`, `"POST"`, ...).
    fn method(&self) -> &str;

    /// Looks up a header by name, case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;

    /// Looks up a query-string parameter by name.
    fn query(&self, name: &str) -> Option<&str>;

    /// Looks up a field in the parsed request body (form or JSON), if the
    /// caller's framework exposes one.
    fn body_field(&self, name: &str) -> Option<&str>;

    /// The remote address of the peer, if known (proxies may hide it).
    fn remote_addr(&self) -> Option<&str>;
}

/// A terminable HTTP response. The middleware either sets headers and
/// calls `next()` implicitly (by returning `MiddlewareOutcome::Continue`)
/// or terminates the response itself via [`MiddlewareOutcome::Reject`].
pub trait HttpResponse {
    /// Sets (overwriting any prior value) a response header.
    fn set_header(&mut self, name: &str, value: String);
}

/// What a middleware decided to do with a request, handed back to the
/// caller's framework integration to act on (continue to the next
/// handler, or terminate the response with the given status/body).
#[derive(Debug, Clone)]
pub enum MiddlewareOutcome {
    /// Proceed to `next()`. Headers have already been set on the response.
    Continue,
    /// Terminate the response immediately with this status and JSON body.
    Reject {
        status: u16,
        body: ErrorResponseBody,
    },
}

/// The `{error, message, details?}` shape every HTTP-facing failure in
/// this workspace renders to (spec §7).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponseBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A simple owned request/response pair used by this workspace's own
/// tests and examples in place of a real framework — implements both
/// contract traits over plain maps.
#[derive(Debug, Clone, Default)]
pub struct TestRequest {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: HashMap<String, String>,
    pub remote_addr: Option<String>,
}

impl HttpRequest for TestRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_ascii_lowercase() == name)
            .map(|(_, v)| v.as_str())
    }

    fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|v| v.as_str())
    }

    fn body_field(&self, name: &str) -> Option<&str> {
        self.body.get(name).map(|v| v.as_str())
    }

    fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestResponse {
    pub headers: HashMap<String, String>,
}

impl HttpResponse for TestResponse {
    fn set_header(&mut self, name: &str, value: String) {
        self.headers.insert(name.to_string(), value);
    }
}
