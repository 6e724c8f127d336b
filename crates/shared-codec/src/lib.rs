//! # Shared Codec - Token Serialization and Encryption
//!
//! Everything needed to turn a typed state value into an opaque token and
//! back:
//!
//! - [`Serializer`] / [`Unserializer`] - one-way encoding roles, with a
//!   JSON implementation (authoritative) and a compact binary
//!   implementation (token-size optimization).
//! - [`Encryptor`] / [`Decryptor`] - AES-256-GCM with a 12-byte random
//!   nonce prepended to the ciphertext, Base64 standard envelope.
//! - [`BufferPool`] - reusable byte buffers handed out as RAII guards.
//! - [`SecretKey`] - 32-byte key material with hex parsing and
//!   zeroize-on-drop.
//!
//! ## Token format
//!
//! ```text
//! Base64( nonce(12B) ‖ ciphertext ‖ gcm-tag(16B) )
//! ```
//!
//! Nonces come from the OS CSPRNG and are never reused; no associated data
//! is bound. The cipher instance is built once per codec and reused across
//! calls.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod binary;
pub mod decryptor;
pub mod encryptor;
pub mod errors;
pub mod json;
pub mod key;
pub mod pool;
pub mod serializer;

pub use binary::{BinarySerializer, BinaryUnserializer};
pub use decryptor::Decryptor;
pub use encryptor::Encryptor;
pub use errors::CodecError;
pub use json::{JsonSerializer, JsonUnserializer};
pub use key::{generate_key, SecretKey};
pub use pool::{BufferPool, PooledBuf};
pub use serializer::{Serializer, Unserializer};

/// Minimum key length in bytes (AES-256).
pub const MIN_KEY_LEN: usize = 32;

/// Nonce length in bytes (96-bit GCM nonce).
pub const NONCE_LEN: usize = 12;
