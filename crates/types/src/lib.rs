//! Core types for the Nebula document repository.
//!
//! This crate provides the foundational vocabulary used by every layer of the
//! repository:
//!
//! - Identifier types ([`Tag`], [`Version`], [`Name`]) with their textual forms
//! - Content addressing ([`Digest`], [`Citation`])
//! - The document model ([`DocumentContent`], [`Document`], [`Signature`])
//! - Canonical serialization ([`codec`]) and boundary validation ([`validation`])
//!
//! Everything here is backend-agnostic: no I/O, no async, no storage layout.

#![warn(missing_docs)]

pub mod base32;
pub mod codec;
pub mod digest;
pub mod document;
pub mod types;
pub mod validation;

pub use codec::CodecError;
pub use digest::{Digest, sha256};
pub use document::{CAPACITY_ATTRIBUTE, Document, DocumentContent, Signature};
pub use types::{Citation, Name, Tag, Version};
pub use validation::ValidationError;
