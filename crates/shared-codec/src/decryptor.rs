//! Token decryption.

use crate::errors::CodecError;
use crate::key::SecretKey;
use crate::serializer::Unserializer;
use crate::NONCE_LEN;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Opens Base64 tokens back into typed values.
pub struct Decryptor<T> {
    unserializer: Box<dyn Unserializer<T>>,
    cipher: Aes256Gcm,
}

impl<T> Decryptor<T> {
    /// Build a decryptor bound to `key` and a decoding strategy.
    pub fn new(unserializer: Box<dyn Unserializer<T>>, key: &SecretKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Self {
            unserializer,
            cipher,
        }
    }

    /// Decrypt `token` into `out`.
    ///
    /// Tampering and wrong keys both surface as [`CodecError::AuthFailure`];
    /// the AEAD tag does not distinguish them.
    pub fn decrypt(&self, token: &str, out: &mut T) -> Result<(), CodecError> {
        let raw = BASE64.decode(token).map_err(CodecError::Base64Error)?;

        if raw.len() < NONCE_LEN {
            return Err(CodecError::TruncatedCiphertext(raw.len()));
        }
        let (nonce_bytes, sealed) = raw.split_at(NONCE_LEN);

        let serialized = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| CodecError::AuthFailure)?;

        self.unserializer.unserialize(&serialized, out)
    }
}
