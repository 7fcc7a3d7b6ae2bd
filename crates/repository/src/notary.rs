//! The notary boundary.
//!
//! Notarization is pure compute: content bytes in, signature and citation
//! out. The repository takes the notary as an injected dependency so
//! deployments can plug in hardware modules or remote signing services; the
//! [`SoftwareNotary`] here is the development and test implementation.

use std::fmt;

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};
use nebula_repository_storage::CredentialSource;
use nebula_repository_types::{
    Citation, CodecError, Document, DocumentContent, Signature, base32, sha256,
};
use snafu::{ResultExt, Snafu};

/// Result type alias for notary operations.
pub type Result<T, E = NotaryError> = std::result::Result<T, E>;

/// Notary failure.
#[derive(Debug, Snafu)]
pub enum NotaryError {
    /// The document could not be canonically encoded.
    #[snafu(display("canonical encoding failed: {source}"))]
    Canonical {
        /// Underlying codec error.
        source: CodecError,
    },

    /// The document's signature does not match its content.
    #[snafu(display("document signature is invalid"))]
    InvalidSignature,
}

/// Signs documents and derives citations.
///
/// `notarize` and `cite` must agree: the digest inside a citation covers the
/// canonical encoding of the whole notarized document, so any two notaries
/// given the same document produce the same citation.
pub trait Notary: Send + Sync + fmt::Debug {
    /// Seals content into an immutable notarized document.
    ///
    /// # Errors
    ///
    /// Returns [`NotaryError::Canonical`] if the content cannot be encoded.
    fn notarize(&self, content: DocumentContent) -> Result<Document>;

    /// Derives the citation that names a notarized document.
    ///
    /// # Errors
    ///
    /// Returns [`NotaryError::Canonical`] if the document cannot be encoded.
    fn cite(&self, document: &Document) -> Result<Citation>;

    /// Checks a document's signature against its content.
    ///
    /// # Errors
    ///
    /// Returns [`NotaryError::InvalidSignature`] on mismatch.
    fn verify(&self, document: &Document) -> Result<()>;

    /// Produces a fresh base-32 signed credential blob for one request.
    ///
    /// # Errors
    ///
    /// Returns [`NotaryError::Canonical`] if the blob cannot be assembled.
    fn credentials(&self) -> Result<String>;
}

/// Ed25519 software notary for development and tests.
///
/// The signing key is held in memory only; the type deliberately implements
/// neither `Serialize` nor a key-revealing `Debug`, so the private component
/// cannot leak into logs or stored documents.
pub struct SoftwareNotary {
    signing_key: SigningKey,
}

impl fmt::Debug for SoftwareNotary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SoftwareNotary(<private>)")
    }
}

impl SoftwareNotary {
    /// Generates a notary with a random signing key.
    #[must_use]
    pub fn new() -> Self {
        Self::from_seed(rand::random())
    }

    /// Builds a notary from a fixed seed, for deterministic tests.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self { signing_key: SigningKey::from_bytes(&seed) }
    }

    /// The public half of the signing key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl Default for SoftwareNotary {
    fn default() -> Self {
        Self::new()
    }
}

impl Notary for SoftwareNotary {
    fn notarize(&self, content: DocumentContent) -> Result<Document> {
        let bytes = content.canonical().context(CanonicalSnafu)?;
        let signature = self.signing_key.sign(&bytes);
        Ok(Document { content, signature: Signature(signature.to_bytes().to_vec()) })
    }

    fn cite(&self, document: &Document) -> Result<Citation> {
        let bytes = document.canonical().context(CanonicalSnafu)?;
        Ok(Citation::new(document.tag(), document.version().clone(), sha256(&bytes)))
    }

    fn verify(&self, document: &Document) -> Result<()> {
        let bytes = document.content.canonical().context(CanonicalSnafu)?;
        let signature = DalekSignature::from_slice(document.signature.as_bytes())
            .map_err(|_| NotaryError::InvalidSignature)?;
        self.signing_key
            .verifying_key()
            .verify_strict(&bytes, &signature)
            .map_err(|_| NotaryError::InvalidSignature)
    }

    fn credentials(&self) -> Result<String> {
        // nonce || public key || signature(nonce || public key)
        let nonce: [u8; 16] = rand::random();
        let verifying_key = self.signing_key.verifying_key();
        let mut payload = Vec::with_capacity(16 + 32);
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(verifying_key.as_bytes());
        let signature = self.signing_key.sign(&payload);
        payload.extend_from_slice(&signature.to_bytes());
        Ok(base32::encode(&payload))
    }
}

impl CredentialSource for SoftwareNotary {
    fn credentials(&self) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Notary::credentials(self).map_err(Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nebula_repository_types::Name;

    use super::*;

    fn content() -> DocumentContent {
        DocumentContent::draft(Name::new("/permissions/public/v1").unwrap())
            .with_attribute("$text", "hello")
    }

    #[test]
    fn test_notarize_then_verify() {
        let notary = SoftwareNotary::new();
        let document = notary.notarize(content()).unwrap();
        assert_eq!(document.signature.as_bytes().len(), 64);
        notary.verify(&document).unwrap();
    }

    #[test]
    fn test_tampering_breaks_verification() {
        let notary = SoftwareNotary::new();
        let mut document = notary.notarize(content()).unwrap();
        document.content =
            document.content.clone().with_attribute("$text", "tampered");
        assert!(matches!(notary.verify(&document), Err(NotaryError::InvalidSignature)));
    }

    #[test]
    fn test_citation_is_stable_across_notaries() {
        // Citations depend only on document bytes, not on who derives them.
        let alpha = SoftwareNotary::from_seed([7u8; 32]);
        let beta = SoftwareNotary::from_seed([9u8; 32]);
        let document = alpha.notarize(content()).unwrap();
        assert_eq!(alpha.cite(&document).unwrap(), beta.cite(&document).unwrap());
    }

    #[test]
    fn test_same_content_same_digest() {
        let notary = SoftwareNotary::from_seed([1u8; 32]);
        let content = content();
        let first = notary.notarize(content.clone()).unwrap();
        let second = notary.notarize(content).unwrap();
        // Ed25519 is deterministic, so the documents and citations agree.
        assert_eq!(first, second);
        assert_eq!(notary.cite(&first).unwrap(), notary.cite(&second).unwrap());
    }

    #[test]
    fn test_credentials_are_fresh_per_call() {
        let notary = SoftwareNotary::new();
        let one = Notary::credentials(&notary).unwrap();
        let two = Notary::credentials(&notary).unwrap();
        assert_ne!(one, two, "nonce must differ per request");
        // Blob decodes and carries nonce + key + signature.
        let decoded = base32::decode(&one).unwrap();
        assert_eq!(decoded.len(), 16 + 32 + 64);
    }

    #[test]
    fn test_debug_hides_key_material() {
        let notary = SoftwareNotary::from_seed([3u8; 32]);
        assert_eq!(format!("{notary:?}"), "SoftwareNotary(<private>)");
    }
}
