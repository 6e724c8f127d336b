//! Environment variable parsing and key material resolution.

use shared_codec::{CodecError, SecretKey};
use std::str::FromStr;
use tracing::warn;

/// Read an integer environment variable, falling back on absence or a
/// parse failure.
#[must_use]
pub fn parse_int_env<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value.parse().unwrap_or(default),
        _ => default,
    }
}

/// Read a string environment variable with a default.
#[must_use]
pub fn parse_string_env(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

/// Read a boolean environment variable.
///
/// Accepts `1/t/true/on` and `0/f/false/off/null`; anything else is false.
#[must_use]
pub fn parse_bool_env(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => parse_bool(&value),
        _ => default,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "t" | "true" | "on")
}

/// Resolve the server key from the `--private-key` / `PRIVATE_KEY` value.
///
/// With no key configured, a random one is generated and logged once so an
/// operator can make it persistent; tokens minted under a random key die
/// with the process.
pub fn resolve_private_key(configured: Option<&str>) -> Result<SecretKey, CodecError> {
    match configured {
        Some(hex_key) if !hex_key.is_empty() => SecretKey::from_hex(hex_key),
        _ => {
            let key = SecretKey::generate()?;
            warn!(
                key = %key.to_hex(),
                "initialized with a random private key; set PRIVATE_KEY to make it persistent"
            );
            Ok(key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_grammar() {
        for value in ["1", "t", "true", "on"] {
            assert!(parse_bool(value), "{value} should be true");
        }
        for value in ["0", "f", "false", "off", "null", "junk"] {
            assert!(!parse_bool(value), "{value} should be false");
        }
    }

    #[test]
    fn test_resolve_key_from_hex() {
        let key = SecretKey::generate().unwrap();
        let resolved = resolve_private_key(Some(&key.to_hex())).unwrap();
        assert_eq!(resolved.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_resolve_key_generates_when_absent() {
        let a = resolve_private_key(None).unwrap();
        let b = resolve_private_key(Some("")).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_resolve_key_rejects_bad_hex() {
        assert!(resolve_private_key(Some("not-hex")).is_err());
    }

    #[test]
    fn test_int_env_default() {
        assert_eq!(parse_int_env("OPAQUEDB_TEST_UNSET_PORT", 3001u16), 3001);
    }
}
