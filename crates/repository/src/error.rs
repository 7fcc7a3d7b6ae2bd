//! Public error surface of the repository API.
//!
//! Lower layers produce typed errors with their own context (driver,
//! facade, notary); the repository wraps whichever it catches exactly once
//! more, recording the procedure and its arguments. Every error also maps
//! to a coarse [`ErrorKind`] so HTTP routers and CLI wrappers can translate
//! without matching on deep variants.

use nebula_repository_storage::DriverError;
use nebula_repository_types::{Name, ValidationError};
use snafu::Snafu;

use crate::facade::FacadeError;
use crate::notary::NotaryError;

/// Coarse classification of repository failures.
///
/// Absent objects are not errors anywhere in the API (reads return `None`,
/// deletes return `false`), so there is no `NotFound` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A write would overwrite an immutable object.
    Conflict,
    /// A referenced type or name is not present.
    UnknownType,
    /// The bag is at declared capacity.
    BagFull,
    /// A returned or acked message was no longer leased.
    LeaseExpired,
    /// The bag does not exist.
    NoBag,
    /// Credentials were rejected, or a signature failed to verify.
    InvalidCredentials,
    /// Input or stored bytes could not be interpreted.
    MalformedRequest,
    /// A remote backend accepted the request but never answered.
    ServerDown,
    /// Generic backend failure (I/O, cancellation, deadline).
    Io,
}

/// Classifies a driver error.
fn driver_kind(error: &DriverError) -> ErrorKind {
    match error {
        DriverError::Conflict { .. } => ErrorKind::Conflict,
        DriverError::ServerDown { .. } => ErrorKind::ServerDown,
        DriverError::InvalidCredentials { .. } => ErrorKind::InvalidCredentials,
        DriverError::MalformedResponse { .. } | DriverError::InvalidUrl { .. } => {
            ErrorKind::MalformedRequest
        },
        DriverError::Io { .. }
        | DriverError::Backend { .. }
        | DriverError::Cancelled { .. }
        | DriverError::DeadlineExceeded { .. } => ErrorKind::Io,
    }
}

impl FacadeError {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            FacadeError::NameExists { .. }
            | FacadeError::ContractExists { .. }
            | FacadeError::DocumentExists { .. }
            | FacadeError::MessageExists { .. } => ErrorKind::Conflict,
            FacadeError::BagFull { .. } => ErrorKind::BagFull,
            FacadeError::LeaseExpired { .. } => ErrorKind::LeaseExpired,
            FacadeError::NoBag { .. } => ErrorKind::NoBag,
            FacadeError::MalformedBag { .. }
            | FacadeError::Corrupt { .. }
            | FacadeError::Encoding { .. } => ErrorKind::MalformedRequest,
            FacadeError::Notarization { source, .. } => notary_kind(source),
            FacadeError::Storage { source, .. } => driver_kind(source),
        }
    }
}

/// Classifies a notary error.
fn notary_kind(error: &NotaryError) -> ErrorKind {
    match error {
        NotaryError::InvalidSignature => ErrorKind::InvalidCredentials,
        NotaryError::Canonical { .. } => ErrorKind::MalformedRequest,
    }
}

/// Repository API failure, carrying the procedure and its arguments.
///
/// All context fields are captured before the error site, so a failure deep
/// in a driver still reports which public operation, with which arguments,
/// was executing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RepositoryError {
    /// A facade operation failed.
    #[snafu(display("repository::{procedure}({arguments}): {source}"))]
    Operation {
        /// The public procedure that was executing.
        procedure: &'static str,
        /// Rendered arguments of the call.
        arguments: String,
        /// The underlying facade error.
        source: FacadeError,
    },

    /// An argument failed shape validation.
    #[snafu(display("repository::{procedure}({arguments}): invalid argument: {source}"))]
    InvalidArgument {
        /// The public procedure that was executing.
        procedure: &'static str,
        /// Rendered arguments of the call.
        arguments: String,
        /// The underlying validation error.
        source: ValidationError,
    },

    /// The notary refused to sign or cite.
    #[snafu(display("repository::{procedure}({arguments}): {source}"))]
    Notarization {
        /// The public procedure that was executing.
        procedure: &'static str,
        /// Rendered arguments of the call.
        arguments: String,
        /// The underlying notary error.
        source: NotaryError,
    },

    /// A referenced document type does not exist.
    #[snafu(display("repository::{procedure}: unknown type {type_name}"))]
    UnknownType {
        /// The public procedure that was executing.
        procedure: &'static str,
        /// The missing type's name.
        type_name: Name,
    },
}

impl RepositoryError {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::Operation { source, .. } => source.kind(),
            RepositoryError::InvalidArgument { .. } => ErrorKind::MalformedRequest,
            RepositoryError::Notarization { source, .. } => notary_kind(source),
            RepositoryError::UnknownType { .. } => ErrorKind::UnknownType,
        }
    }
}
