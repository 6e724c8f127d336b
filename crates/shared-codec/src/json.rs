//! JSON token encoding.
//!
//! The authoritative encoding: every deployment supports it, and all wire
//! examples in the API documentation assume it.

use crate::errors::CodecError;
use crate::pool::{BufferPool, PooledBuf};
use crate::serializer::{Serializer, Unserializer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Serializes values as JSON into pooled buffers.
pub struct JsonSerializer<T> {
    pool: BufferPool,
    _marker: PhantomData<fn(&T)>,
}

impl<T> JsonSerializer<T> {
    #[must_use]
    pub fn new(pool: BufferPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize> Serializer<T> for JsonSerializer<T> {
    fn serialize(&self, value: &T) -> Result<PooledBuf, CodecError> {
        let mut buf = self.pool.acquire();
        serde_json::to_writer(&mut buf, value)
            .map_err(|e| CodecError::SerializeFailure(e.to_string()))?;
        Ok(buf)
    }
}

/// Decodes JSON-encoded values.
pub struct JsonUnserializer<T> {
    _marker: PhantomData<fn(&T)>,
}

impl<T> JsonUnserializer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonUnserializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Unserializer<T> for JsonUnserializer<T> {
    fn unserialize(&self, bytes: &[u8], out: &mut T) -> Result<(), CodecError> {
        *out = serde_json::from_slice(bytes).map_err(|e| {
            tracing::debug!(error = %e, "json decode failed");
            CodecError::DecodeError(e.to_string())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_roundtrip() {
        let pool = BufferPool::new();
        let serializer = JsonSerializer::<Sample>::new(pool);
        let unserializer = JsonUnserializer::<Sample>::new();

        let value = Sample {
            name: "x".into(),
            count: 3,
        };
        let bytes = serializer.serialize(&value).unwrap();

        let mut out = Sample::default();
        unserializer.unserialize(&bytes, &mut out).unwrap();
        assert_eq!(out, value);
    }

    #[test]
    fn test_malformed_input_is_decode_error() {
        let unserializer = JsonUnserializer::<Sample>::new();
        let mut out = Sample::default();
        let err = unserializer.unserialize(b"{not json", &mut out).unwrap_err();
        assert!(matches!(err, CodecError::DecodeError(_)));
    }

    #[test]
    fn test_serializer_releases_buffers() {
        let pool = BufferPool::new();
        let serializer = JsonSerializer::<Sample>::new(pool.clone());
        for _ in 0..4 {
            let bytes = serializer.serialize(&Sample::default()).unwrap();
            assert!(!bytes.is_empty());
        }
        // All loans returned; the pool reuses a single buffer serially.
        assert_eq!(pool.idle(), 1);
    }
}
