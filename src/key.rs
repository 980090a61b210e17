//! Content-addressed key: `sha256:` + 64 lowercase hex characters.

use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

use crate::bytes::{from_hex, to_hex};
use crate::error::CasError;

/// A raw 32-byte SHA-256 digest.
pub type Digest = [u8; 32];

const PREFIX: &str = "sha256:";

/// The canonical handle for a node: `sha256:` followed by 64 lowercase hex
/// digits of the SHA-256 digest of the node's exact byte image.
///
/// Keys are immutable and compare by value; two keys are equal iff their
/// underlying digests are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Digest);

impl Key {
    /// Wraps a raw digest as a key. Does not validate anything beyond shape
    /// (there is nothing to validate — any 32 bytes is a well-formed digest).
    pub fn from_digest(digest: Digest) -> Self {
        Self(digest)
    }

    /// Returns the underlying digest.
    pub fn digest(&self) -> Digest {
        self.0
    }

    /// Formats the key as `sha256:` + 64 lowercase hex chars.
    pub fn to_string_key(&self) -> String {
        format!("{}{}", PREFIX, to_hex(&self.0))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, to_hex(&self.0))
    }
}

impl FromStr for Key {
    type Err = CasError;

    /// Strict parse: exactly `sha256:` followed by 64 lowercase hex chars.
    /// Any other prefix, wrong length, or non-hex/uppercase tail fails with
    /// `InvalidKeyFormat`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s.strip_prefix(PREFIX).ok_or(CasError::InvalidKeyFormat)?;
        if hex_part.len() != 64 {
            return Err(CasError::InvalidKeyFormat);
        }
        let bytes = from_hex(hex_part).ok_or(CasError::InvalidKeyFormat)?;
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes);
        Ok(Key(digest))
    }
}

impl TryFrom<&str> for Key {
    type Error = CasError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Key::from_str(s)
    }
}

impl TryFrom<String> for Key {
    type Error = CasError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Key::from_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trip() {
        let digest = [0x11u8; 32];
        let key = Key::from_digest(digest);
        let s = key.to_string_key();
        assert_eq!(s.len(), PREFIX.len() + 64);
        let parsed: Key = s.parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn key_rejects_bad_prefix() {
        let s = format!("md5:{}", "a".repeat(64));
        assert!(matches!(Key::from_str(&s), Err(CasError::InvalidKeyFormat)));
    }

    #[test]
    fn key_rejects_wrong_length() {
        let s = format!("{}{}", PREFIX, "a".repeat(63));
        assert!(matches!(Key::from_str(&s), Err(CasError::InvalidKeyFormat)));
    }

    #[test]
    fn key_rejects_uppercase_hex() {
        let s = format!("{}{}", PREFIX, "A".repeat(64));
        assert!(matches!(Key::from_str(&s), Err(CasError::InvalidKeyFormat)));
    }

    #[test]
    fn key_rejects_non_hex_tail() {
        let s = format!("{}{}", PREFIX, "z".repeat(64));
        assert!(matches!(Key::from_str(&s), Err(CasError::InvalidKeyFormat)));
    }
}
