//! Storage key derivation.
//!
//! Keys are derived once, here, and are identical across every driver: the
//! local filesystem, the object store, and the remote service all address an
//! object by the same string. Sigils (`/` on names, `#` on tags) are display
//! artifacts and never reach storage.
//!
//! Key shapes:
//!
//! - name:     `nebula/examples/Queue/v1`
//! - document: `{tag}/{version}`
//! - message:  `{bag-tag}/{bag-version}/{state}/{msg-tag}/{msg-version}`

use std::fmt;

use nebula_repository_types::{Citation, Name, Tag, Version};

/// Visibility state of a message inside its bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageState {
    /// Visible to borrowers.
    Available,
    /// Leased to a borrower; invisible until acked, returned, or reclaimed.
    Processing,
}

impl MessageState {
    /// Both states, in layout order.
    pub const ALL: [MessageState; 2] = [MessageState::Available, MessageState::Processing];

    /// The state's storage-layout segment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageState::Available => "available",
            MessageState::Processing => "processing",
        }
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage key for a name binding: the name with its leading `/` stripped.
#[must_use]
pub fn name_key(name: &Name) -> String {
    name.as_str().trim_start_matches('/').to_string()
}

/// Storage key for a (tag, version) pair: `{tag}/{version}`, bare base-32 tag.
///
/// Drafts and documents share this shape; the digest is deliberately absent
/// so a draft keeps its key across edits.
#[must_use]
pub fn object_key(tag: Tag, version: &Version) -> String {
    format!("{}/{}", tag.bare(), version)
}

/// Storage key for a cited document.
#[must_use]
pub fn doc_key(citation: &Citation) -> String {
    object_key(citation.tag, &citation.version)
}

/// Key prefix for one state of one bag.
#[must_use]
pub fn bag_prefix(bag: &Citation, state: MessageState) -> String {
    format!("{}/{}/{}", bag.tag.bare(), bag.version, state)
}

/// Full key for a message in a bag state.
#[must_use]
pub fn message_key(bag: &Citation, state: MessageState, message: &Citation) -> String {
    format!("{}/{}", bag_prefix(bag, state), doc_key(message))
}
