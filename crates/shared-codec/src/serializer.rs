//! One-way serialization roles.
//!
//! Serializers and unserializers are separate traits so an encoder cannot
//! be wired where a decoder belongs; the type system rejects the mix-up at
//! construction time.

use crate::errors::CodecError;
use crate::pool::PooledBuf;

/// Encodes values of `T` into pooled bytes.
pub trait Serializer<T>: Send + Sync {
    /// Serialize `value`, returning the encoded bytes in a pooled buffer.
    fn serialize(&self, value: &T) -> Result<PooledBuf, CodecError>;
}

/// Decodes values of `T` from bytes.
pub trait Unserializer<T>: Send + Sync {
    /// Decode `bytes` into `out`, replacing its previous contents.
    fn unserialize(&self, bytes: &[u8], out: &mut T) -> Result<(), CodecError>;
}
