//! Key material handling.

use crate::errors::CodecError;
use crate::MIN_KEY_LEN;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 32-byte AES-256 key. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; MIN_KEY_LEN]);

impl SecretKey {
    /// Wrap raw key bytes. Anything shorter than 32 bytes is rejected;
    /// longer input is truncated to the AES-256 key size.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < MIN_KEY_LEN {
            return Err(CodecError::KeyTooShort(bytes.len()));
        }
        let mut key = [0u8; MIN_KEY_LEN];
        key.copy_from_slice(&bytes[..MIN_KEY_LEN]);
        Ok(Self(key))
    }

    /// Parse a lowercase hex key string, as carried in `PRIVATE_KEY`.
    pub fn from_hex(hex_str: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| CodecError::DecodeError(format!("invalid hex key: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Generate a fresh random key from the OS CSPRNG.
    pub fn generate() -> Result<Self, CodecError> {
        let mut key = [0u8; MIN_KEY_LEN];
        OsRng
            .try_fill_bytes(&mut key)
            .map_err(CodecError::NonceFailure)?;
        Ok(Self(key))
    }

    /// Hex form, suitable for printing as `PRIVATE_KEY=<hex>`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; MIN_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Generate raw random key bytes, used by the `--init-private-key` one-shot.
pub fn generate_key() -> Result<[u8; MIN_KEY_LEN], CodecError> {
    let mut key = [0u8; MIN_KEY_LEN];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(CodecError::NonceFailure)?;
    Ok(key)
}
