//! Pluggable value encoding for the cache and job queue.
//!
//! Cache backends and job payloads both need to turn arbitrary
//! `Serialize + DeserializeOwned` values into bytes for storage and back.
//! [`Serializer`] is the seam: the in-memory backends can skip it and keep
//! values as `Any`, but any backend that crosses a process boundary needs
//! one, and [`JsonSerializer`] is the default every subsystem wires in.

use crate::error::{Error, ErrorKind};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes and decodes values for backends that store bytes rather than
/// live Rust values.
///
/// The two methods take generic parameters rather than `&dyn Serialize`/a
/// return-position generic, which keeps this trait simple to implement but
/// means it cannot be used as `dyn Serializer` — callers that want a
/// pluggable serializer behind a stable type (as `aegis-cache` does) are
/// generic over `S: Serializer` instead, defaulting to [`JsonSerializer`].
pub trait Serializer: Send + Sync {
    /// Encodes a value to bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, Error>;

    /// Decodes bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, Error>;
}

/// The default serializer: JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(value).map_err(|e| {
            Error::new(
                ErrorKind::SerializationFailed,
                format!("failed to encode value as JSON: {e}"),
            )
        })
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, Error> {
        serde_json::from_slice(bytes).map_err(|e| {
            Error::new(
                ErrorKind::SerializationFailed,
                format!("failed to decode value from JSON: {e}"),
            )
        })
    }
}
