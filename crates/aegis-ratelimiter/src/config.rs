//! Rate limiter configuration (spec §4.3.1, §4.3.3, §6.1).

use crate::store::RateLimitStore;
use aegis_core::config::{resolve, resolve_duration_ms};
use aegis_core::http::HttpRequest;
use aegis_core::{Error, ErrorKind};
use std::sync::Arc;
use std::time::Duration;

/// Derives the client key for a request: tries a configurable proxy
/// header (first hop), then the connection's remote address, then the
/// literal `"unknown"` (spec §4.3.1 step 1, Open Question #3 — all
/// unidentifiable clients intentionally share one bucket).
pub type KeyFunction = Arc<dyn Fn(&dyn HttpRequest) -> String + Send + Sync>;

fn default_key_function(proxy_header: &'static str) -> KeyFunction {
    Arc::new(move |req: &dyn HttpRequest| {
        if let Some(value) = req.header(proxy_header) {
            if let Some(first_hop) = value.split(',').next() {
                let trimmed = first_hop.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
        if let Some(addr) = req.remote_addr() {
            return addr.to_string();
        }
        "unknown".to_string()
    })
}

pub struct RateLimiterConfig {
    pub max_requests: u64,
    pub window: Duration,
    pub message: String,
    pub key_function: KeyFunction,
    pub store: Arc<dyn RateLimitStore>,
}

impl RateLimiterConfig {
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct RateLimiterConfigBuilder {
    max_requests: Option<u64>,
    window: Option<Duration>,
    message: Option<String>,
    key_function: Option<KeyFunction>,
    store: Option<Arc<dyn RateLimitStore>>,
    proxy_header: Option<&'static str>,
}

impl RateLimiterConfigBuilder {
    pub fn max_requests(mut self, max_requests: u64) -> Self {
        self.max_requests = Some(max_requests);
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn key_function(mut self, key_function: KeyFunction) -> Self {
        self.key_function = Some(key_function);
        self
    }

    pub fn store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Overrides which header the default key function trusts for the
    /// client's forwarded address. Ignored if [`Self::key_function`] is set.
    pub fn proxy_header(mut self, header: &'static str) -> Self {
        self.proxy_header = Some(header);
        self
    }

    /// Resolves `RATE_LIMIT_MAX`/`RATE_LIMIT_WINDOW_MS` per §6.1 and
    /// validates per §4.3.3 (`window > 0`, `max_requests >= 0` — since
    /// `max_requests` is unsigned here, only a zero window can fail).
    pub fn build(self) -> Result<RateLimiterConfig, Error> {
        let max_requests = resolve(self.max_requests, "RATE_LIMIT_MAX", 100);
        let window = resolve_duration_ms(self.window, "RATE_LIMIT_WINDOW_MS", Duration::from_millis(900_000));

        if window.is_zero() {
            return Err(Error::new(ErrorKind::InvalidArgument, "windowMs must be greater than zero"));
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(crate::store::InMemoryStore::new(window)));

        Ok(RateLimiterConfig {
            max_requests,
            window,
            message: self.message.unwrap_or_else(|| "Too many requests, please try again later.".to_string()),
            key_function: self
                .key_function
                .unwrap_or_else(|| default_key_function(self.proxy_header.unwrap_or("x-forwarded-for"))),
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::http::TestRequest;

    #[test]
    fn zero_window_is_rejected() {
        let err = RateLimiterConfig::builder().window(Duration::ZERO).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn defaults_match_documented_defaults() {
        std::env::remove_var("RATE_LIMIT_MAX");
        std::env::remove_var("RATE_LIMIT_WINDOW_MS");
        let config = RateLimiterConfig::builder().build().unwrap();
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window, Duration::from_millis(900_000));
    }

    #[test]
    fn default_key_function_prefers_proxy_header() {
        let config = RateLimiterConfig::builder().build().unwrap();
        let mut req = TestRequest::default();
        req.headers.insert("x-forwarded-for".to_string(), "1.2.3.4, 5.6.7.8".to_string());
        req.remote_addr = Some("9.9.9.9".to_string());
        assert_eq!((config.key_function)(&req), "1.2.3.4");
    }

    #[test]
    fn default_key_function_falls_back_to_remote_addr() {
        let config = RateLimiterConfig::builder().build().unwrap();
        let mut req = TestRequest::default();
        req.remote_addr = Some("9.9.9.9".to_string());
        assert_eq!((config.key_function)(&req), "9.9.9.9");
    }

    #[test]
    fn default_key_function_falls_back_to_unknown() {
        let config = RateLimiterConfig::builder().build().unwrap();
        let req = TestRequest::default();
        assert_eq!((config.key_function)(&req), "unknown");
    }
}
