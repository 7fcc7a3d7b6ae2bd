//! Storage layer for the Nebula document repository.
//!
//! This crate unifies several very different backends behind one small
//! capability set, so the layers above never see a filesystem path, an HTTP
//! status, or an object-store SDK type:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Storage Facade                  │   (nebula-repository)
//! │   object protocol + bag state machine        │
//! └────────────────┬────────────────────────────┘
//!                  │  exists / read / write / delete / list
//! ┌────────────────▼────────────────────────────┐
//! │             StorageDriver                    │   (this crate)
//! │  LocalDriver │ InMemoryDriver │              │
//! │  ObjectStoreDriver │ RemoteDriver            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Also provided here:
//!
//! - [`keys`] - derivation of stable, backend-independent storage keys
//! - [`ObjectCache`] - bounded FIFO cache for immutable objects
//! - [`OpContext`] - per-call deadline and cancellation

#![warn(missing_docs)]

pub mod cache;
pub mod context;
pub mod driver;
pub mod keys;
mod local;
mod memory;
mod object;
mod remote;

pub use cache::{DEFAULT_CACHE_CAPACITY, ObjectCache};
pub use context::OpContext;
pub use driver::{DriverError, Namespace, Result, StorageDriver, WriteMode};
pub use keys::MessageState;
pub use local::LocalDriver;
pub use memory::InMemoryDriver;
pub use object::ObjectStoreDriver;
pub use remote::{CredentialSource, RemoteDriver};
