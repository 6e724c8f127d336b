//! Token encryption.

use crate::errors::CodecError;
use crate::key::SecretKey;
use crate::serializer::Serializer;
use crate::NONCE_LEN;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Seals typed values into opaque Base64 tokens.
///
/// The cipher is constructed once and reused; the instance is safe to share
/// across request tasks.
pub struct Encryptor<T> {
    serializer: Box<dyn Serializer<T>>,
    cipher: Aes256Gcm,
}

impl<T> Encryptor<T> {
    /// Build an encryptor bound to `key` and a serialization strategy.
    pub fn new(serializer: Box<dyn Serializer<T>>, key: &SecretKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Self { serializer, cipher }
    }

    /// Encrypt `value` into `Base64( nonce ‖ ciphertext ‖ tag )`.
    ///
    /// A fresh 12-byte nonce is drawn from the OS CSPRNG for every call and
    /// prepended to the sealed bytes. No associated data is bound.
    pub fn encrypt(&self, value: &T) -> Result<String, CodecError> {
        let serialized = self.serializer.serialize(value)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(CodecError::NonceFailure)?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, serialized.as_slice())
            .map_err(|_| CodecError::CipherFailure)?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&sealed);

        Ok(BASE64.encode(envelope))
    }
}
