//! The document model: mutable content, notarized documents, signatures.
//!
//! A [`DocumentContent`] is the author-controlled payload: identifiers,
//! permissions, and a sorted attribute map. The notary seals content into a
//! [`Document`] by attaching an Ed25519 [`Signature`] over the canonical
//! encoding; from then on the bytes are immutable and content-addressed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::Value;

use crate::codec::{self, CodecError};
use crate::types::{Name, Tag, Version};

/// Well-known attribute declaring a bag's message capacity.
pub const CAPACITY_ATTRIBUTE: &str = "$capacity";

/// Mutable, pre-notarization document payload.
///
/// The attribute map is a `BTreeMap` so the canonical JSON encoding is
/// deterministic; the digest of a document depends on these bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentContent {
    /// Document family identifier, chosen at draft time.
    pub tag: Tag,
    /// Version within the family, chosen at draft time.
    pub version: Version,
    /// Name of the document type this content was drafted from, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_name: Option<Name>,
    /// Name of the permission set governing access to this document.
    pub permissions: Name,
    /// Domain attributes; keys conventionally carry a `$` prefix.
    pub attributes: BTreeMap<String, Value>,
}

impl DocumentContent {
    /// Creates empty content with a fresh random tag at the initial version.
    #[must_use]
    pub fn draft(permissions: Name) -> Self {
        Self {
            tag: Tag::random(),
            version: Version::initial(),
            type_name: None,
            permissions,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets one attribute, consuming and returning the content for chaining.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Looks up an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns the declared `$capacity`, for contents that describe a bag.
    #[must_use]
    pub fn capacity(&self) -> Option<u64> {
        self.attributes.get(CAPACITY_ATTRIBUTE).and_then(Value::as_u64)
    }

    /// Canonical byte encoding of this content.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if serialization fails.
    pub fn canonical(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }
}

/// Detached Ed25519 signature over a document's canonical content bytes.
///
/// Serialized as lower-hex. Always 64 bytes when produced by a notary;
/// stored as `Vec<u8>` so malformed wire input can be represented and then
/// rejected by verification rather than by deserialization.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// Returns the raw signature bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.iter().take(4).map(|b| format!("{b:02x}")).collect();
        write!(f, "Signature({prefix}…)")
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.len() % 2 != 0 {
            return Err(de::Error::custom("signature hex must have even length"));
        }
        let bytes = text
            .as_bytes()
            .chunks_exact(2)
            .map(|chunk| {
                std::str::from_utf8(chunk)
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| de::Error::custom("signature must be lower-hex"))
            })
            .collect::<Result<Vec<u8>, D::Error>>()?;
        Ok(Self(bytes))
    }
}

/// Immutable notarized document: content plus the notary's signature.
///
/// Documents, contracts, and messages are all this type; the namespace they
/// are stored in determines their role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The sealed payload.
    pub content: DocumentContent,
    /// Signature over the content's canonical encoding.
    pub signature: Signature,
}

impl Document {
    /// Returns the document family tag.
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.content.tag
    }

    /// Returns the document version.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.content.version
    }

    /// Returns the declared `$capacity`, for bag contracts.
    #[must_use]
    pub fn capacity(&self) -> Option<u64> {
        self.content.capacity()
    }

    /// Canonical byte encoding of the whole notarized document.
    ///
    /// This is what digests are computed over.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if serialization fails.
    pub fn canonical(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn permissions() -> Name {
        Name::new("/permissions/public/v1").unwrap()
    }

    #[test]
    fn test_draft_starts_at_initial_version() {
        let content = DocumentContent::draft(permissions());
        assert_eq!(content.version, Version::initial());
        assert!(content.attributes.is_empty());
        assert!(content.type_name.is_none());
    }

    #[test]
    fn test_attributes_and_capacity() {
        let content = DocumentContent::draft(permissions())
            .with_attribute("$capacity", 8u64)
            .with_attribute("$description", "work queue");
        assert_eq!(content.capacity(), Some(8));
        assert_eq!(
            content.attribute("$description").and_then(Value::as_str),
            Some("work queue")
        );
        assert!(content.attribute("$missing").is_none());
    }

    #[test]
    fn test_capacity_requires_unsigned_integer() {
        let content = DocumentContent::draft(permissions()).with_attribute("$capacity", "eight");
        assert_eq!(content.capacity(), None);
    }

    #[test]
    fn test_canonical_encoding_is_deterministic() {
        // Attribute insertion order must not affect the canonical bytes.
        let base = DocumentContent::draft(permissions());
        let forward = base.clone().with_attribute("$a", 1).with_attribute("$b", 2);
        let reverse = base.with_attribute("$b", 2).with_attribute("$a", 1);
        assert_eq!(forward.canonical().unwrap(), reverse.canonical().unwrap());
    }

    #[test]
    fn test_document_serde_round_trip() {
        let document = Document {
            content: DocumentContent::draft(permissions()).with_attribute("$x", 1),
            signature: Signature(vec![0xab; 64]),
        };
        let bytes = document.canonical().unwrap();
        let decoded: Document = crate::codec::decode(&bytes).unwrap();
        assert_eq!(decoded, document);
    }

    #[test]
    fn test_signature_hex_round_trip() {
        let signature = Signature(vec![0x00, 0xff, 0x10]);
        let json = serde_json::to_string(&signature).unwrap();
        assert_eq!(json, "\"00ff10\"");
        let decoded: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, signature);
    }
}
