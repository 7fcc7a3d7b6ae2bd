//! Object-store storage driver (S3, GCS, Azure, and local/in-memory stores).
//!
//! Each namespace maps to a configured store URL and prefix, so deployments
//! can keep documents and contracts in distinct buckets. Supported URL
//! schemes:
//!
//! - `s3://bucket/prefix` - Amazon S3 or compatible (MinIO, Wasabi, ...)
//! - `gs://bucket/prefix` - Google Cloud Storage
//! - `az://container/prefix` - Azure Blob Storage
//! - `file:///path` - local filesystem through the object-store API
//! - `memory:` - in-process store, for tests
//!
//! Credentials come from the standard environment variables of each provider
//! (`AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`/`AWS_REGION`/`AWS_ENDPOINT`,
//! `GOOGLE_APPLICATION_CREDENTIALS`, `AZURE_STORAGE_ACCOUNT_NAME`/
//! `AZURE_STORAGE_ACCOUNT_KEY`).
//!
//! Tombstones in versioned buckets surface as not-found from the store and
//! are treated as plain absence.
//!
//! ## Message-bag support
//!
//! The borrow tie-break requires `delete` to report whether the caller
//! removed the object. S3's DELETE is unconditional (204 for absent keys),
//! so plain S3 cannot honor that contract; message-namespace operations are
//! rejected on `s3://` stores. GCS and Azure return not-found for absent
//! deletes and are accepted, as are `file://` and `memory:` stores.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use nebula_repository_types::Digest;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload};
use url::Url;

use crate::context::OpContext;
use crate::driver::{DriverError, Namespace, Result, StorageDriver, WriteMode};

/// File suffix for terminal objects.
const OBJECT_SUFFIX: &str = ".bali";

/// One namespace's backing store.
struct NamespaceStore {
    store: Arc<dyn ObjectStore>,
    prefix: ObjectPath,
    /// Whether `delete` distinguishes absent keys (required for messages).
    exclusive_delete: bool,
}

/// Object-store storage driver.
pub struct ObjectStoreDriver {
    stores: HashMap<Namespace, NamespaceStore>,
}

impl fmt::Debug for ObjectStoreDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ObjectStoreDriver");
        for namespace in Namespace::ALL {
            if let Some(ns) = self.stores.get(&namespace) {
                debug.field(namespace.as_str(), &format_args!("{}/{}", ns.store, ns.prefix));
            }
        }
        debug.finish()
    }
}

impl ObjectStoreDriver {
    /// Creates a driver with every namespace under one base URL.
    ///
    /// Namespaces become path prefixes beneath the URL's own prefix.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidUrl`] for unparseable URLs or
    /// unsupported schemes.
    pub fn from_url(base: &str) -> Result<Self> {
        let mut urls = HashMap::new();
        for namespace in Namespace::ALL {
            let joined = if base.ends_with('/') || base.ends_with(':') {
                format!("{base}{namespace}")
            } else {
                format!("{base}/{namespace}")
            };
            urls.insert(namespace, joined);
        }
        Self::from_namespace_urls(&urls)
    }

    /// Creates a driver with an explicit store URL per namespace.
    ///
    /// All five namespaces must be configured.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidUrl`] for a missing namespace,
    /// unparseable URL, or unsupported scheme.
    pub fn from_namespace_urls(urls: &HashMap<Namespace, String>) -> Result<Self> {
        let mut stores = HashMap::new();
        for namespace in Namespace::ALL {
            let url = urls.get(&namespace).ok_or_else(|| DriverError::InvalidUrl {
                url: String::new(),
                message: format!("no store URL configured for namespace {namespace}"),
            })?;
            stores.insert(namespace, create_store(url)?);
        }
        Ok(Self { stores })
    }

    fn namespace_store(&self, namespace: Namespace, method: &'static str) -> Result<&NamespaceStore> {
        let ns = self.stores.get(&namespace).ok_or_else(|| DriverError::Backend {
            namespace,
            key: String::new(),
            method,
            message: "namespace not configured".to_string(),
        })?;
        if namespace == Namespace::Messages && !ns.exclusive_delete {
            return Err(DriverError::Backend {
                namespace,
                key: String::new(),
                method,
                message: "this store cannot report delete-existence; message bags are \
                          not supported on it"
                    .to_string(),
            });
        }
        Ok(ns)
    }

    fn object_path(ns: &NamespaceStore, key: &str) -> ObjectPath {
        if ns.prefix.as_ref().is_empty() {
            ObjectPath::from(format!("{key}{OBJECT_SUFFIX}"))
        } else {
            ObjectPath::from(format!("{}/{key}{OBJECT_SUFFIX}", ns.prefix))
        }
    }

    fn backend_error(
        namespace: Namespace,
        key: &str,
        method: &'static str,
        error: &object_store::Error,
    ) -> DriverError {
        DriverError::Backend {
            namespace,
            key: key.to_string(),
            method,
            message: error.to_string(),
        }
    }
}

/// Builds a store and prefix from one URL.
fn create_store(url: &str) -> Result<NamespaceStore> {
    let invalid = |message: String| DriverError::InvalidUrl { url: url.to_string(), message };

    let parsed = Url::parse(url).map_err(|error| invalid(error.to_string()))?;
    let prefix = parsed.path().trim_matches('/').to_string();
    let host =
        || parsed.host_str().ok_or_else(|| invalid("URL must include a bucket host".to_string()));

    let (store, exclusive_delete): (Arc<dyn ObjectStore>, bool) = match parsed.scheme() {
        "s3" => {
            let mut builder = object_store::aws::AmazonS3Builder::new()
                .with_bucket_name(host()?)
                .with_region(
                    std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                );
            if let Ok(key_id) = std::env::var("AWS_ACCESS_KEY_ID") {
                builder = builder.with_access_key_id(key_id);
            }
            if let Ok(secret) = std::env::var("AWS_SECRET_ACCESS_KEY") {
                builder = builder.with_secret_access_key(secret);
            }
            if let Ok(endpoint) = std::env::var("AWS_ENDPOINT") {
                builder = builder.with_endpoint(endpoint).with_virtual_hosted_style_request(false);
            }
            let store = builder.build().map_err(|error| invalid(error.to_string()))?;
            // S3 DELETE is idempotent and cannot report prior existence.
            (Arc::new(store), false)
        },
        "gs" => {
            let mut builder = object_store::gcp::GoogleCloudStorageBuilder::new()
                .with_bucket_name(host()?);
            if let Ok(credentials) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
                builder = builder.with_service_account_path(credentials);
            }
            let store = builder.build().map_err(|error| invalid(error.to_string()))?;
            (Arc::new(store), true)
        },
        "az" | "azure" => {
            let account = std::env::var("AZURE_STORAGE_ACCOUNT_NAME")
                .map_err(|_| invalid("AZURE_STORAGE_ACCOUNT_NAME is not set".to_string()))?;
            let mut builder = object_store::azure::MicrosoftAzureBuilder::new()
                .with_account(account)
                .with_container_name(host()?);
            if let Ok(access_key) = std::env::var("AZURE_STORAGE_ACCOUNT_KEY") {
                builder = builder.with_access_key(access_key);
            }
            let store = builder.build().map_err(|error| invalid(error.to_string()))?;
            (Arc::new(store), true)
        },
        "file" => {
            let path = parsed.path();
            std::fs::create_dir_all(path).map_err(|error| invalid(error.to_string()))?;
            let store = object_store::local::LocalFileSystem::new_with_prefix(path)
                .map_err(|error| invalid(error.to_string()))?;
            return Ok(NamespaceStore {
                store: Arc::new(store),
                prefix: ObjectPath::from(""),
                exclusive_delete: true,
            });
        },
        "memory" => (Arc::new(object_store::memory::InMemory::new()), true),
        other => {
            return Err(invalid(format!(
                "unsupported scheme {other:?}; supported: s3, gs, az, file, memory"
            )));
        },
    };

    Ok(NamespaceStore { store, prefix: ObjectPath::from(prefix), exclusive_delete })
}

#[async_trait]
impl StorageDriver for ObjectStoreDriver {
    async fn exists(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        let ns = self.namespace_store(namespace, "exists")?;
        let path = Self::object_path(ns, key);
        ctx.run("exists", async {
            match ns.store.head(&path).await {
                Ok(_) => Ok(true),
                Err(object_store::Error::NotFound { .. }) => Ok(false),
                Err(error) => Err(Self::backend_error(namespace, key, "exists", &error)),
            }
        })
        .await
    }

    async fn read(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        key: &str,
    ) -> Result<Option<Bytes>> {
        let ns = self.namespace_store(namespace, "read")?;
        let path = Self::object_path(ns, key);
        ctx.run("read", async {
            match ns.store.get(&path).await {
                Ok(result) => {
                    let bytes = result
                        .bytes()
                        .await
                        .map_err(|error| Self::backend_error(namespace, key, "read", &error))?;
                    Ok(Some(bytes))
                },
                Err(object_store::Error::NotFound { .. }) => Ok(None),
                Err(error) => Err(Self::backend_error(namespace, key, "read", &error)),
            }
        })
        .await
    }

    async fn write(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        key: &str,
        payload: Bytes,
        mode: WriteMode,
        _digest: Option<&Digest>,
    ) -> Result<()> {
        let ns = self.namespace_store(namespace, "write")?;
        let path = Self::object_path(ns, key);
        let options = PutOptions::from(match mode {
            WriteMode::CreateOnly => PutMode::Create,
            WriteMode::Overwrite => PutMode::Overwrite,
        });
        ctx.run("write", async {
            match ns.store.put_opts(&path, PutPayload::from(payload), options).await {
                Ok(_) => Ok(()),
                Err(object_store::Error::AlreadyExists { .. }) => {
                    Err(DriverError::Conflict { namespace, key: key.to_string() })
                },
                Err(error) => Err(Self::backend_error(namespace, key, "write", &error)),
            }
        })
        .await
    }

    async fn delete(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        let ns = self.namespace_store(namespace, "delete")?;
        let path = Self::object_path(ns, key);
        ctx.run("delete", async {
            match ns.store.delete(&path).await {
                Ok(()) => Ok(true),
                Err(object_store::Error::NotFound { .. }) => Ok(false),
                Err(error) => Err(Self::backend_error(namespace, key, "delete", &error)),
            }
        })
        .await
    }

    async fn list(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<String>> {
        let ns = self.namespace_store(namespace, "list")?;
        let list_prefix = if prefix.is_empty() {
            ns.prefix.clone()
        } else if ns.prefix.as_ref().is_empty() {
            ObjectPath::from(prefix)
        } else {
            ObjectPath::from(format!("{}/{prefix}", ns.prefix))
        };
        let relative_start =
            if list_prefix.as_ref().is_empty() { String::new() } else { format!("{list_prefix}/") };

        ctx.run("list", async {
            let mut stream = ns.store.list(Some(&list_prefix));
            let mut keys = Vec::new();
            loop {
                match stream.try_next().await {
                    Ok(Some(meta)) => {
                        let location = meta.location.as_ref();
                        let Some(relative) = location.strip_prefix(&relative_start) else {
                            continue;
                        };
                        if let Some(key) = relative.strip_suffix(OBJECT_SUFFIX) {
                            keys.push(key.to_string());
                        }
                    },
                    Ok(None) => break,
                    Err(error) => {
                        return Err(Self::backend_error(namespace, prefix, "list", &error));
                    },
                }
            }
            keys.sort();
            keys.truncate(max_keys);
            Ok(keys)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ctx() -> OpContext {
        OpContext::new()
    }

    fn memory_driver() -> ObjectStoreDriver {
        ObjectStoreDriver::from_url("memory:").unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_and_suffix_layout() {
        let driver = memory_driver();
        let payload = Bytes::from_static(b"{\"v\":1}");
        driver
            .write(&ctx(), Namespace::Documents, "T/v1", payload.clone(), WriteMode::Overwrite, None)
            .await
            .unwrap();
        assert!(driver.exists(&ctx(), Namespace::Documents, "T/v1").await.unwrap());
        assert_eq!(driver.read(&ctx(), Namespace::Documents, "T/v1").await.unwrap(), Some(payload));
    }

    #[tokio::test]
    async fn test_create_only_conflict() {
        let driver = memory_driver();
        driver
            .write(
                &ctx(),
                Namespace::Names,
                "a/v1",
                Bytes::from_static(b"one"),
                WriteMode::CreateOnly,
                None,
            )
            .await
            .unwrap();
        let err = driver
            .write(
                &ctx(),
                Namespace::Names,
                "a/v1",
                Bytes::from_static(b"two"),
                WriteMode::CreateOnly,
                None,
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let driver = memory_driver();
        driver
            .write(
                &ctx(),
                Namespace::Messages,
                "b/v1/available/m/v1",
                Bytes::from_static(b"m"),
                WriteMode::Overwrite,
                None,
            )
            .await
            .unwrap();
        assert!(driver.delete(&ctx(), Namespace::Messages, "b/v1/available/m/v1").await.unwrap());
        assert!(!driver.delete(&ctx(), Namespace::Messages, "b/v1/available/m/v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_relative_sorted_bounded() {
        let driver = memory_driver();
        for key in ["b/v1/available/m2/v1", "b/v1/available/m1/v1", "b/v1/processing/m3/v1"] {
            driver
                .write(
                    &ctx(),
                    Namespace::Messages,
                    key,
                    Bytes::from_static(b"m"),
                    WriteMode::Overwrite,
                    None,
                )
                .await
                .unwrap();
        }
        let keys = driver.list(&ctx(), Namespace::Messages, "b/v1/available", 10).await.unwrap();
        assert_eq!(keys, vec!["m1/v1".to_string(), "m2/v1".to_string()]);
        let bounded = driver.list(&ctx(), Namespace::Messages, "b/v1/available", 1).await.unwrap();
        assert_eq!(bounded.len(), 1);
    }

    #[tokio::test]
    async fn test_namespaces_are_disjoint_stores() {
        let driver = memory_driver();
        driver
            .write(
                &ctx(),
                Namespace::Drafts,
                "T/v1",
                Bytes::from_static(b"d"),
                WriteMode::Overwrite,
                None,
            )
            .await
            .unwrap();
        assert!(!driver.exists(&ctx(), Namespace::Documents, "T/v1").await.unwrap());
    }

    #[test]
    fn test_unsupported_scheme_is_rejected() {
        let err = ObjectStoreDriver::from_url("ftp://bucket/data").unwrap_err();
        assert!(matches!(err, DriverError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_s3_stores_reject_message_usage() {
        // Construction succeeds; only the messages namespace is refused.
        let driver = ObjectStoreDriver::from_url("s3://test-bucket/repo").unwrap();
        let err =
            driver.list(&ctx(), Namespace::Messages, "b/v1/available", 10).await.unwrap_err();
        assert!(matches!(err, DriverError::Backend { .. }));
        assert!(err.to_string().contains("message bags"));
    }
}
