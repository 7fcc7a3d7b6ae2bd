//! Base-32 encoding for tags and credential blobs.
//!
//! Uses a 32-character alphabet of digits and uppercase consonants. The
//! letters E, I, O, and U are excluded so encoded identifiers cannot spell
//! words and survive transcription (no 0/O or 1/I confusion).

/// The base-32 alphabet, indexed by 5-bit value.
pub const ALPHABET: &[u8; 32] = b"0123456789ABCDFGHJKLMNPQRSTVWXYZ";

/// Encodes bytes as base-32 text.
///
/// A final partial group is padded with zero bits; no padding characters are
/// emitted. Twenty input bytes encode to exactly 32 characters.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &byte in bytes {
        acc = (acc << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((acc >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[((acc << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Decodes base-32 text back into bytes.
///
/// Returns `None` if any character falls outside the alphabet. Trailing pad
/// bits are discarded, so `decode(encode(b)) == b` for all inputs.
#[must_use]
pub fn decode(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for ch in text.bytes() {
        let value = ALPHABET.iter().position(|&a| a == ch)? as u32;
        acc = (acc << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((acc >> bits) & 0xff) as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_twenty_bytes_encode_to_32_chars() {
        assert_eq!(encode(&[0u8; 20]).len(), 32);
        assert_eq!(encode(&[0xffu8; 20]).len(), 32);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(encode(&[]), "");
        assert_eq!(encode(&[0]), "00");
        assert_eq!(encode(&[0xff]), "ZW");
    }

    #[test]
    fn test_decode_rejects_foreign_characters() {
        assert!(decode("EVIL").is_none());
        assert!(decode("abc").is_none());
        assert!(decode("0 1").is_none());
    }

    proptest! {
        #[test]
        fn prop_round_trips(bytes in prop::collection::vec(any::<u8>(), 0..200)) {
            prop_assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
        }
    }
}
