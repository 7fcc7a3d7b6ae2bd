//! The storage driver capability set.
//!
//! Every backend implements the same five primitives over namespaced keys.
//! The facade depends only on this trait, never on a driver identity, so
//! backends are interchangeable as long as they honor two contracts:
//!
//! - `write` with [`WriteMode::CreateOnly`] fails with [`DriverError::Conflict`]
//!   when the key exists, without touching storage.
//! - `delete` returns `true` only for the caller that actually removed the
//!   object. This is the tie-break the message borrow loop relies on; a
//!   backend that cannot provide it must reject message usage.
//!
//! Whole objects are written atomically (tempfile+rename, single PUT): readers
//! observe the pre- or post-state of a write, never a torn intermediate.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nebula_repository_types::Digest;
use snafu::Snafu;

use crate::context::OpContext;

/// Result type alias for driver operations.
pub type Result<T, E = DriverError> = std::result::Result<T, E>;

/// The five object classes a repository stores.
///
/// Namespaces partition the key space; the same key can exist independently
/// in several namespaces (a draft and a document of the same citation key
/// are distinct objects, and forbidden to coexist by the facade).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Name → citation bindings. Immutable once written.
    Names,
    /// Editable pre-commit drafts. Freely overwritten and deleted.
    Drafts,
    /// Committed notarized documents. Immutable; staging slot for promotion.
    Documents,
    /// Promoted contracts (including bag declarations). Immutable.
    Contracts,
    /// Bag messages, keyed by bag, state, and message citation.
    Messages,
}

impl Namespace {
    /// All namespaces, in storage-layout order.
    pub const ALL: [Namespace; 5] = [
        Namespace::Names,
        Namespace::Drafts,
        Namespace::Documents,
        Namespace::Contracts,
        Namespace::Messages,
    ];

    /// The namespace's storage-layout directory / bucket segment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Namespace::Names => "names",
            Namespace::Drafts => "drafts",
            Namespace::Documents => "documents",
            Namespace::Contracts => "contracts",
            Namespace::Messages => "messages",
        }
    }

    /// True for classes whose objects never change once written.
    ///
    /// Immutable classes are cacheable and stored read-only; drafts and
    /// messages are neither.
    #[must_use]
    pub const fn is_immutable(self) -> bool {
        matches!(self, Namespace::Names | Namespace::Documents | Namespace::Contracts)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overwrite policy for [`StorageDriver::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with [`DriverError::Conflict`] if the key already exists.
    CreateOnly,
    /// Replace any existing object under the key.
    Overwrite,
}

/// Typed driver failure carrying the operation's context.
///
/// `Conflict` is distinct from generic I/O failure, and an absent key on
/// `read`/`exists`/`delete` is not an error at all.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DriverError {
    /// Local I/O failure.
    #[snafu(display("{method} failed for {namespace}/{key}: {source}"))]
    Io {
        /// Namespace of the failed operation.
        namespace: Namespace,
        /// Key of the failed operation.
        key: String,
        /// Driver primitive that failed.
        method: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A `CreateOnly` write found the key already present.
    #[snafu(display("write conflict: {namespace}/{key} already exists"))]
    Conflict {
        /// Namespace of the conflicting key.
        namespace: Namespace,
        /// The conflicting key.
        key: String,
    },

    /// Backend-specific failure (object store, malformed listing, ...).
    #[snafu(display("{method} failed for {namespace}/{key}: {message}"))]
    Backend {
        /// Namespace of the failed operation.
        namespace: Namespace,
        /// Key of the failed operation.
        key: String,
        /// Driver primitive that failed.
        method: &'static str,
        /// Backend error description.
        message: String,
    },

    /// Remote driver: the request was sent but no response arrived.
    #[snafu(display("no response from {url}: {message}"))]
    ServerDown {
        /// The unreachable endpoint.
        url: String,
        /// Transport error description.
        message: String,
    },

    /// Remote driver: the service rejected the request credentials.
    #[snafu(display("credentials rejected by {url} (status {status})"))]
    InvalidCredentials {
        /// The rejecting endpoint.
        url: String,
        /// HTTP status code returned.
        status: u16,
    },

    /// Remote driver: the response could not be interpreted.
    #[snafu(display("malformed response from {url}: {message}"))]
    MalformedResponse {
        /// The endpoint that answered.
        url: String,
        /// What was wrong with the response.
        message: String,
    },

    /// The configured endpoint or store URL is unusable.
    #[snafu(display("invalid storage URL {url:?}: {message}"))]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parse or scheme error description.
        message: String,
    },

    /// The caller's cancellation token fired mid-operation.
    ///
    /// A cancelled write is an unknown outcome: a retry may observe either
    /// the pre- or the post-state.
    #[snafu(display("{method} cancelled by caller"))]
    Cancelled {
        /// Driver primitive that was cancelled.
        method: &'static str,
    },

    /// The per-call deadline elapsed before the operation completed.
    #[snafu(display("{method} exceeded its deadline"))]
    DeadlineExceeded {
        /// Driver primitive that timed out.
        method: &'static str,
    },
}

impl DriverError {
    /// True if this error is a `CreateOnly` conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, DriverError::Conflict { .. })
    }
}

/// Backend-specific primitive object I/O.
///
/// All methods suspend on I/O and honor the deadline and cancellation token
/// carried by `ctx`. Implementations hold no shared mutable state beyond an
/// optional connection pool.
#[async_trait]
pub trait StorageDriver: fmt::Debug + Send + Sync {
    /// Returns whether an object exists under the key.
    async fn exists(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool>;

    /// Reads an object's payload; `Ok(None)` when absent.
    async fn read(&self, ctx: &OpContext, namespace: Namespace, key: &str)
    -> Result<Option<Bytes>>;

    /// Writes an object atomically.
    ///
    /// `digest` is the content digest of the cited object, forwarded as an
    /// integrity header by drivers that transmit one; local backends ignore
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Conflict`] when `mode` is
    /// [`WriteMode::CreateOnly`] and the key exists.
    async fn write(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        key: &str,
        payload: Bytes,
        mode: WriteMode,
        digest: Option<&Digest>,
    ) -> Result<()>;

    /// Deletes an object, returning whether it existed.
    ///
    /// Under concurrent deletes of the same key, exactly one caller receives
    /// `true`.
    async fn delete(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool>;

    /// Lists up to `max_keys` keys under `prefix`, sorted, relative to the
    /// prefix (no leading separator).
    ///
    /// An empty prefix lists the whole namespace.
    async fn list(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<String>>;
}

#[async_trait]
impl<T: StorageDriver + ?Sized> StorageDriver for Arc<T> {
    async fn exists(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        (**self).exists(ctx, namespace, key).await
    }

    async fn read(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        key: &str,
    ) -> Result<Option<Bytes>> {
        (**self).read(ctx, namespace, key).await
    }

    async fn write(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        key: &str,
        payload: Bytes,
        mode: WriteMode,
        digest: Option<&Digest>,
    ) -> Result<()> {
        (**self).write(ctx, namespace, key, payload, mode, digest).await
    }

    async fn delete(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        (**self).delete(ctx, namespace, key).await
    }

    async fn list(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<String>> {
        (**self).list(ctx, namespace, prefix, max_keys).await
    }
}
