//! Codec error taxonomy.

use thiserror::Error;

/// Errors from serialization, encryption, and decryption.
///
/// Callers on the request path must not echo the variant to clients; the
/// distinction is for server-side logs only.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Key material shorter than the AES-256 minimum.
    #[error("key length {0} below minimum {min}", min = crate::MIN_KEY_LEN)]
    KeyTooShort(usize),

    /// The OS CSPRNG failed to produce a nonce.
    #[error("nonce generation failed")]
    NonceFailure(#[source] rand::Error),

    /// The value could not be serialized.
    #[error("serialization failed: {0}")]
    SerializeFailure(String),

    /// The AEAD seal operation failed.
    #[error("cipher operation failed")]
    CipherFailure,

    /// The token was not valid Base64.
    #[error("base64 decoding failed")]
    Base64Error(#[source] base64::DecodeError),

    /// The decoded token is shorter than a nonce.
    #[error("ciphertext length {0} below nonce size {nonce}", nonce = crate::NONCE_LEN)]
    TruncatedCiphertext(usize),

    /// Authentication failed: tampered data or wrong key.
    #[error("authentication failed")]
    AuthFailure,

    /// Decrypted bytes could not be decoded into the target type.
    #[error("decoding serialized data failed: {0}")]
    DecodeError(String),

    /// A binary type name was registered for two different types.
    #[error("type name {0:?} already registered for a different type")]
    TypeNameConflict(String),
}
