//! Canonical serialization for repository objects.
//!
//! Objects are encoded as compact JSON with struct-field order fixed by the
//! type definitions and attribute maps sorted (`BTreeMap`), so the same value
//! always produces the same bytes. Digests and signatures are computed over
//! this encoding, which makes determinism a correctness requirement, not a
//! cosmetic one.

use serde::{Serialize, de::DeserializeOwned};
use snafu::Snafu;

/// Error type for codec operations.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Encoding failed.
    #[snafu(display("encoding failed: {source}"))]
    Encode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Decoding failed.
    #[snafu(display("decoding failed: {source}"))]
    Decode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },
}

/// Encodes a value to its canonical bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|source| CodecError::Encode { source })
}

/// Decodes a value from its canonical bytes.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the bytes are not a valid encoding of `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|source| CodecError::Decode { source })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u64,
        label: String,
    }

    #[test]
    fn test_round_trip() {
        let original = Sample { id: 7, label: "seven".to_string() };
        let bytes = encode(&original).unwrap();
        let decoded: Sample = decode(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_same_value_same_bytes() {
        let value = Sample { id: 1, label: "stable".to_string() };
        assert_eq!(encode(&value).unwrap(), encode(&value).unwrap());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result: Result<Sample, _> = decode(b"not json at all");
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }
}
