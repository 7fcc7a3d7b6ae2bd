//! The Nebula document repository.
//!
//! A content-addressed storage service that persists immutable notarized
//! documents under stable identifiers, exposes mutable named pointers
//! ("citations") to their latest committed version, supports editable
//! pre-commit drafts, and maintains lease-based message bags for
//! asynchronous work distribution.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │           DocumentRepository                 │
//! │   public API: draft / commit / messages     │
//! └──────┬──────────────────────────┬───────────┘
//!        │                          │
//! ┌──────▼───────┐          ┌───────▼───────────┐
//! │    Notary    │          │   StorageFacade    │
//! │ sign + cite  │          │ object protocol +  │
//! │ (injected)   │          │ bag state machine  │
//! └──────────────┘          └───────┬───────────┘
//!                                   │
//!                    ┌──────────────▼──────────────┐
//!                    │  StorageDriver + ObjectCache │
//!                    │  (nebula-repository-storage) │
//!                    └─────────────────────────────┘
//! ```
//!
//! The repository owns the facade, the facade owns the driver and the
//! caches; nothing points back up.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod facade;
pub mod notary;
pub mod repository;
pub mod sweeper;

pub use config::{LeaseConfig, RepositoryConfig, StorageConfig};
pub use error::{ErrorKind, RepositoryError};
pub use facade::{FacadeError, StorageFacade};
pub use notary::{Notary, NotaryError, SoftwareNotary};
pub use repository::DocumentRepository;
pub use sweeper::{LeaseSweeper, SweeperConfig};

// Commonly used lower-layer types, re-exported so callers rarely need the
// storage crate directly.
pub use nebula_repository_storage::{
    InMemoryDriver, LocalDriver, MessageState, ObjectStoreDriver, OpContext, RemoteDriver,
    StorageDriver,
};
