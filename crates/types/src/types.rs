//! Identifier types for the Nebula document repository.
//!
//! - [`Tag`] - globally unique opaque identifier, 20 random bytes in base-32
//! - [`Version`] - ordered dot-separated version (`v1.2.3`)
//! - [`Name`] - hierarchical human-readable label (`/nebula/types/Queue/v1`)
//! - [`Citation`] - immutable `{tag, version, digest}` reference to a document
//!
//! All four have stable textual forms used both on the wire and (after sigil
//! stripping) as storage keys, so `Display`/`FromStr` round-trips are part of
//! the contract and are covered by property tests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::base32;
use crate::digest::Digest;
use crate::validation::{ValidationError, validate_name};

// ============================================================================
// Tag
// ============================================================================

/// Globally unique opaque identifier for a document family.
///
/// A tag is 20 random bytes, rendered as 32 base-32 characters with a leading
/// `#` sigil: `#LV8P2N5QRSTVWXYZ0123456789ABCDFG`. The sigil is part of the
/// display form only; storage keys use the bare base-32 form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag([u8; Tag::SIZE]);

impl Tag {
    /// Raw size of a tag in bytes.
    pub const SIZE: usize = 20;

    /// Length of the base-32 form (without the sigil).
    pub const ENCODED_SIZE: usize = 32;

    /// Generates a new random tag from the process RNG.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Wraps raw bytes, for tags decoded from storage.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Tag::SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Tag::SIZE] {
        &self.0
    }

    /// Returns the bare base-32 form without the `#` sigil.
    ///
    /// This is the form used inside storage keys.
    #[must_use]
    pub fn bare(&self) -> String {
        base32::encode(&self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.bare())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl FromStr for Tag {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let bare = input.strip_prefix('#').unwrap_or(input);
        let error = || ValidationError {
            field: "tag".to_string(),
            constraint: format!(
                "must be {} base-32 characters with optional # sigil, got {input:?}",
                Tag::ENCODED_SIZE
            ),
        };
        if bare.len() != Tag::ENCODED_SIZE {
            return Err(error());
        }
        let bytes: [u8; Tag::SIZE] =
            base32::decode(bare).ok_or_else(error)?.try_into().map_err(|_| error())?;
        Ok(Self(bytes))
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// Version
// ============================================================================

/// Ordered version identifier within a tag: one or more positive integers,
/// rendered `v1.2.3`.
///
/// Ordering is component-wise with shorter prefixes sorting before their
/// extensions (`v1.2` < `v1.2.1` < `v1.3`), which the derived `Ord` on the
/// inner vector provides directly.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(Vec<u32>);

impl Version {
    /// Initial version for newly drafted documents.
    #[must_use]
    pub fn initial() -> Self {
        Self(vec![1])
    }

    /// Creates a version from explicit components.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `components` is empty or any component
    /// is zero.
    pub fn new(components: Vec<u32>) -> Result<Self, ValidationError> {
        if components.is_empty() {
            return Err(ValidationError {
                field: "version".to_string(),
                constraint: "must have at least one component".to_string(),
            });
        }
        if components.contains(&0) {
            return Err(ValidationError {
                field: "version".to_string(),
                constraint: "components must be positive".to_string(),
            });
        }
        Ok(Self(components))
    }

    /// Returns the version components.
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Returns the next version at the finest level: `v1.2.3` → `v1.2.4`.
    ///
    /// Used when a message is returned to its bag under a new version.
    #[must_use]
    pub fn next(&self) -> Self {
        let mut components = self.0.clone();
        if let Some(last) = components.last_mut() {
            *last += 1;
        }
        Self(components)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v")?;
        for (index, component) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, ".")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({self})")
    }
}

impl FromStr for Version {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let bare = input.strip_prefix('v').unwrap_or(input);
        let components = bare
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ValidationError {
                field: "version".to_string(),
                constraint: format!("must be dot-separated integers like v1.2.3, got {input:?}"),
            })?;
        Self::new(components)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// Name
// ============================================================================

/// Hierarchical human-readable label, bound once to a citation.
///
/// Names look like `/nebula/examples/Queue/v1`: a leading slash and one or
/// more non-empty segments of `[A-Za-z0-9.-]`. The leading slash is stripped
/// when a name is used as a storage key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(String);

impl Name {
    /// Creates a validated name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the text violates the name grammar.
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let text = text.into();
        validate_name(&text)?;
        Ok(Self(text))
    }

    /// Returns the full textual form including the leading slash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path segments without the leading slash.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.trim_start_matches('/').split('/')
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl FromStr for Name {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::new(input)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::new(text).map_err(de::Error::custom)
    }
}

// ============================================================================
// Citation
// ============================================================================

/// Immutable reference that names exactly one notarized document.
///
/// The digest covers the document's canonical encoding, so a citation both
/// locates the document and proves its integrity.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    /// Document family identifier.
    pub tag: Tag,
    /// Version within the family.
    pub version: Version,
    /// SHA-256 digest of the document's canonical encoding.
    pub digest: Digest,
}

impl Citation {
    /// Creates a citation from its parts.
    #[must_use]
    pub fn new(tag: Tag, version: Version, digest: Digest) -> Self {
        Self { tag, version, digest }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tag, self.version)
    }
}

impl fmt::Debug for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Citation({}/{} {})", self.tag, self.version, self.digest)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::digest::sha256;

    #[test]
    fn test_tag_display_has_sigil_and_fixed_width() {
        let tag = Tag::random();
        let text = tag.to_string();
        assert!(text.starts_with('#'));
        assert_eq!(text.len(), 1 + Tag::ENCODED_SIZE);
        assert_eq!(tag.bare().len(), Tag::ENCODED_SIZE);
    }

    #[test]
    fn test_tag_round_trip_with_and_without_sigil() {
        let tag = Tag::random();
        assert_eq!(tag.to_string().parse::<Tag>().unwrap(), tag);
        assert_eq!(tag.bare().parse::<Tag>().unwrap(), tag);
    }

    #[test]
    fn test_tag_rejects_bad_input() {
        assert!("#TOO-SHORT".parse::<Tag>().is_err());
        // E is not in the alphabet.
        assert!("E0000000000000000000000000000000".parse::<Tag>().is_err());
        assert!("".parse::<Tag>().is_err());
    }

    #[test]
    fn test_tag_alphabet_excludes_vowel_lookalikes() {
        for banned in [b'E', b'I', b'O', b'U'] {
            assert!(!base32::ALPHABET.contains(&banned));
        }
    }

    #[test]
    fn test_version_display_and_parse() {
        let version: Version = "v1.2.3".parse().unwrap();
        assert_eq!(version.components(), &[1, 2, 3]);
        assert_eq!(version.to_string(), "v1.2.3");
        assert_eq!("1.2.3".parse::<Version>().unwrap(), version);
    }

    #[test]
    fn test_version_rejects_zero_and_empty() {
        assert!("v0".parse::<Version>().is_err());
        assert!("v1.0.2".parse::<Version>().is_err());
        assert!("v".parse::<Version>().is_err());
        assert!("v1..2".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_next_bumps_last_component() {
        let version: Version = "v1.2.3".parse().unwrap();
        assert_eq!(version.next().to_string(), "v1.2.4");
        assert_eq!(Version::initial().next().to_string(), "v2");
    }

    #[test]
    fn test_version_ordering() {
        let parse = |s: &str| s.parse::<Version>().unwrap();
        assert!(parse("v1.2") < parse("v1.2.1"));
        assert!(parse("v1.2.1") < parse("v1.3"));
        assert!(parse("v2") > parse("v1.9.9"));
        let version = parse("v3.1");
        assert!(version < version.next());
    }

    #[test]
    fn test_name_round_trip_and_segments() {
        let name = Name::new("/nebula/examples/Queue/v1").unwrap();
        assert_eq!(name.to_string(), "/nebula/examples/Queue/v1");
        let segments: Vec<_> = name.segments().collect();
        assert_eq!(segments, vec!["nebula", "examples", "Queue", "v1"]);
    }

    #[test]
    fn test_name_rejects_bad_grammar() {
        assert!(Name::new("missing/slash").is_err());
        assert!(Name::new("/double//segment").is_err());
        assert!(Name::new("/trailing/").is_err());
        assert!(Name::new("/bad space").is_err());
        assert!(Name::new("").is_err());
    }

    #[test]
    fn test_citation_serde_round_trip() {
        let citation = Citation::new(
            Tag::random(),
            "v1.2.3".parse().unwrap(),
            sha256(b"payload"),
        );
        let json = serde_json::to_string(&citation).unwrap();
        let decoded: Citation = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, citation);
    }

    proptest! {
        #[test]
        fn prop_tag_base32_round_trips(bytes in any::<[u8; 20]>()) {
            let tag = Tag::from_bytes(bytes);
            let parsed: Tag = tag.to_string().parse().unwrap();
            prop_assert_eq!(parsed, tag);
        }

        #[test]
        fn prop_version_round_trips(components in prop::collection::vec(1u32..1000, 1..5)) {
            let version = Version::new(components).unwrap();
            let parsed: Version = version.to_string().parse().unwrap();
            prop_assert_eq!(parsed, version);
        }
    }
}
