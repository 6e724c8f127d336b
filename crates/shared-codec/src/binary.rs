//! Compact binary token encoding.
//!
//! A bincode-based encoding that produces the smallest tokens. Because the
//! format is not self-describing, dynamic payload maps must use the tagged
//! [`shared_types::Value`] rather than `serde_json::Value`.
//!
//! Codecs are constructed with a type name. Names go into a process-wide
//! registry: registering the same name for the same type is idempotent;
//! reusing a name for a different type is a wiring error and fails fast at
//! construction instead of surfacing later as a decode failure.

use crate::errors::CodecError;
use crate::pool::{BufferPool, PooledBuf};
use crate::serializer::{Serializer, Unserializer};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::OnceLock;

static TYPE_REGISTRY: OnceLock<Mutex<HashMap<String, TypeId>>> = OnceLock::new();

/// Register `name` for type `T`.
///
/// Idempotent per (name, type) pair; a conflict with a previously
/// registered type is an error.
pub fn register_type_name<T: 'static>(name: &str) -> Result<(), CodecError> {
    let registry = TYPE_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
    let mut names = registry.lock();
    match names.get(name) {
        Some(existing) if *existing != TypeId::of::<T>() => {
            Err(CodecError::TypeNameConflict(name.to_string()))
        }
        Some(_) => Ok(()),
        None => {
            names.insert(name.to_string(), TypeId::of::<T>());
            Ok(())
        }
    }
}

/// Serializes values with bincode into pooled buffers.
pub struct BinarySerializer<T> {
    pool: BufferPool,
    _marker: PhantomData<fn(&T)>,
}

impl<T: 'static> BinarySerializer<T> {
    pub fn new(name: &str, pool: BufferPool) -> Result<Self, CodecError> {
        register_type_name::<T>(name)?;
        Ok(Self {
            pool,
            _marker: PhantomData,
        })
    }
}

impl<T: Serialize> Serializer<T> for BinarySerializer<T> {
    fn serialize(&self, value: &T) -> Result<PooledBuf, CodecError> {
        let mut buf = self.pool.acquire();
        bincode::serialize_into(&mut buf, value)
            .map_err(|e| CodecError::SerializeFailure(e.to_string()))?;
        Ok(buf)
    }
}

/// Decodes bincode-encoded values.
pub struct BinaryUnserializer<T> {
    _marker: PhantomData<fn(&T)>,
}

impl<T: 'static> BinaryUnserializer<T> {
    pub fn new(name: &str) -> Result<Self, CodecError> {
        register_type_name::<T>(name)?;
        Ok(Self {
            _marker: PhantomData,
        })
    }
}

impl<T: DeserializeOwned> Unserializer<T> for BinaryUnserializer<T> {
    fn unserialize(&self, bytes: &[u8], out: &mut T) -> Result<(), CodecError> {
        *out = bincode::deserialize(bytes).map_err(|e| {
            tracing::debug!(error = %e, "bincode decode failed");
            CodecError::DecodeError(e.to_string())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use shared_types::Value;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: u64,
        payload: BTreeMap<String, Value>,
    }

    #[test]
    fn test_roundtrip_with_dynamic_payload() {
        let pool = BufferPool::new();
        let serializer = BinarySerializer::<Record>::new("Record", pool).unwrap();
        let unserializer = BinaryUnserializer::<Record>::new("Record").unwrap();

        let value = Record {
            id: 9,
            payload: BTreeMap::from([
                ("k".to_string(), Value::Str("v".to_string())),
                ("n".to_string(), Value::Num(2.5)),
            ]),
        };

        let bytes = serializer.serialize(&value).unwrap();
        let mut out = Record::default();
        unserializer.unserialize(&bytes, &mut out).unwrap();
        assert_eq!(out, value);
    }

    #[test]
    fn test_registration_is_idempotent() {
        assert!(register_type_name::<Record>("RecordAgain").is_ok());
        assert!(register_type_name::<Record>("RecordAgain").is_ok());
    }

    #[test]
    fn test_name_conflict_is_rejected() {
        assert!(register_type_name::<Record>("Conflicted").is_ok());
        let err = register_type_name::<u64>("Conflicted").unwrap_err();
        assert!(matches!(err, CodecError::TypeNameConflict(_)));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let unserializer = BinaryUnserializer::<Record>::new("RecordGarbage").unwrap();
        let mut out = Record::default();
        let err = unserializer
            .unserialize(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff], &mut out)
            .unwrap_err();
        assert!(matches!(err, CodecError::DecodeError(_)));
    }
}
