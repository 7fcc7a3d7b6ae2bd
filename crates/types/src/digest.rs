//! Content digests for the Nebula document repository.
//!
//! All content addressing uses SHA-256 over a document's canonical encoding.
//! The lower-hex textual form is what travels in the `nebula-digest` wire
//! header and inside serialized citations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha2::{Digest as _, Sha256};

use crate::validation::ValidationError;

/// SHA-256 digest of a document's canonical encoding (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; Digest::SIZE]);

impl Digest {
    /// Raw size of a digest in bytes.
    pub const SIZE: usize = 32;

    /// Wraps raw bytes, for digests decoded from storage.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Digest::SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Digest::SIZE] {
        &self.0
    }
}

/// Computes the SHA-256 digest of arbitrary bytes.
#[inline]
#[must_use]
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest(hasher.finalize().into())
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full digests are noisy in logs; eight hex characters identify one.
        write!(f, "Digest({:02x}{:02x}{:02x}{:02x}…)", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Digest {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = || ValidationError {
            field: "digest".to_string(),
            constraint: format!("must be {} lower-hex characters", Digest::SIZE * 2),
        };
        if input.len() != Digest::SIZE * 2
            || !input.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(error());
        }
        let mut bytes = [0u8; Digest::SIZE];
        for (index, chunk) in input.as_bytes().chunks_exact(2).enumerate() {
            let hex = std::str::from_utf8(chunk).map_err(|_| error())?;
            bytes[index] = u8::from_str_radix(hex, 16).map_err(|_| error())?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256("hello")
        let digest = sha256(b"hello");
        assert_eq!(
            digest.to_string(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_display_parse_round_trip() {
        let digest = sha256(b"round trip");
        let parsed: Digest = digest.to_string().parse().unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("deadbeef".parse::<Digest>().is_err());
        // Upper-case hex is not canonical.
        assert!(sha256(b"x").to_string().to_uppercase().parse::<Digest>().is_err());
        assert!("zz".repeat(32).parse::<Digest>().is_err());
    }

    #[test]
    fn test_distinct_content_distinct_digest() {
        assert_ne!(sha256(b"a"), sha256(b"b"));
        assert_eq!(sha256(b"a"), sha256(b"a"));
    }
}
