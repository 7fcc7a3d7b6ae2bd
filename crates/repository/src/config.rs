//! Repository configuration.
//!
//! Deserializable from TOML/JSON config files; every field has a default
//! except the storage backend selection. Driver construction from a
//! [`StorageConfig`] lives here so service binaries never import the
//! storage crate directly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nebula_repository_storage::{
    CredentialSource, DriverError, InMemoryDriver, LocalDriver, ObjectStoreDriver, RemoteDriver,
    StorageDriver,
};
use serde::Deserialize;
use snafu::Snafu;

fn default_cache_capacity() -> usize {
    nebula_repository_storage::DEFAULT_CACHE_CAPACITY
}

fn default_lease_ttl_secs() -> u64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    concat!("nebula-repository/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_remote_timeout_secs() -> u64 {
    30
}

/// Top-level repository configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    /// Capacity of each immutable-object cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Message lease timing.
    #[serde(default)]
    pub lease: LeaseConfig,
    /// Storage backend selection.
    pub storage: StorageConfig,
}

/// Message lease timing configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LeaseConfig {
    /// Seconds a borrowed message stays leased before a sweeper may reclaim
    /// it.
    #[serde(default = "default_lease_ttl_secs")]
    pub ttl_secs: u64,
    /// Seconds between sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_lease_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl LeaseConfig {
    /// The lease TTL as a duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// The sweep interval as a duration.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Storage backend selection.
///
/// ```toml
/// [storage]
/// kind = "local"
/// root = "/var/lib/nebula"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StorageConfig {
    /// In-process map; objects are lost on shutdown. For tests and demos.
    Memory,
    /// One file per object under a root directory.
    Local {
        /// Root directory; created lazily.
        root: PathBuf,
    },
    /// Object store addressed by URL (`s3://`, `gs://`, `az://`,
    /// `file://`, `memory:`).
    ObjectStore {
        /// Base URL; namespaces become prefixes beneath it.
        url: String,
    },
    /// Remote repository service speaking the document-repository wire
    /// format.
    Remote {
        /// Service base URL.
        base_url: String,
        /// Whole-request timeout in seconds.
        #[serde(default = "default_remote_timeout_secs")]
        timeout_secs: u64,
        /// User-agent header for every request.
        #[serde(default = "default_user_agent")]
        user_agent: String,
    },
}

/// Configuration failure.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// The configured backend could not be constructed.
    #[snafu(display("storage backend construction failed: {source}"))]
    Backend {
        /// The underlying driver error.
        source: DriverError,
    },
}

impl StorageConfig {
    /// Builds the configured driver.
    ///
    /// `credentials` is used by the remote backend for its per-request
    /// `nebula-credentials` header; other backends ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Backend`] when the backend cannot be
    /// constructed (bad URL, unsupported scheme).
    pub fn build_driver(
        &self,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Arc<dyn StorageDriver>, ConfigError> {
        let driver: Arc<dyn StorageDriver> = match self {
            StorageConfig::Memory => Arc::new(InMemoryDriver::new()),
            StorageConfig::Local { root } => Arc::new(LocalDriver::new(root.clone())),
            StorageConfig::ObjectStore { url } => {
                Arc::new(ObjectStoreDriver::from_url(url).map_err(|source| ConfigError::Backend { source })?)
            },
            StorageConfig::Remote { base_url, timeout_secs, user_agent } => Arc::new(
                RemoteDriver::with_timeout(
                    base_url,
                    user_agent.clone(),
                    Duration::from_secs(*timeout_secs),
                    credentials,
                )
                .map_err(|source| ConfigError::Backend { source })?,
            ),
        };
        Ok(driver)
    }
}
