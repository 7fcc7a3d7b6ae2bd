//! Local filesystem storage driver.
//!
//! Layout: `<root>/<namespace>/<key>.bali`, one file per object. Key slashes
//! become subdirectories, so a message key
//! `{bag}/{version}/available/{msg}/{version}` lands in a per-state
//! directory that prefix listing can walk cheaply.
//!
//! Durability and atomicity come from the tempfile-then-rename dance: the
//! payload is written to a temporary file in the target directory and
//! renamed into place, so readers observe the old object or the new one,
//! never a torn write. `CreateOnly` uses a no-clobber rename, which is the
//! filesystem's native conditional create.
//!
//! Files carry a single trailing `\n` (appended on write, stripped on read)
//! so stored documents behave like text files under shell tooling. On Unix,
//! immutable classes are written `0o400`, mutable ones `0o600`, directories
//! `0o700`; the driver acquires no locks, safety relies on rename-atomic
//! writes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use nebula_repository_types::Digest;
use snafu::ResultExt;
use tempfile::NamedTempFile;

use crate::context::OpContext;
use crate::driver::{DriverError, IoSnafu, Namespace, Result, StorageDriver, WriteMode};

/// File extension for stored objects.
const OBJECT_EXTENSION: &str = "bali";

/// Local filesystem storage driver.
#[derive(Debug, Clone)]
pub struct LocalDriver {
    root: PathBuf,
}

impl LocalDriver {
    /// Creates a driver rooted at `root`.
    ///
    /// Directories are created lazily on first write, so the root itself
    /// need not exist yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The driver's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of one object.
    fn object_path(&self, namespace: Namespace, key: &str) -> PathBuf {
        self.root.join(namespace.as_str()).join(format!("{key}.{OBJECT_EXTENSION}"))
    }

    /// Rejects keys that would escape the namespace directory.
    fn check_key(namespace: Namespace, key: &str, method: &'static str) -> Result<()> {
        let escapes = key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|segment| segment.is_empty() || segment == "..");
        if escapes {
            return Err(DriverError::Backend {
                namespace,
                key: key.to_string(),
                method,
                message: "key must be non-empty relative segments without '..'".to_string(),
            });
        }
        Ok(())
    }
}

/// Unix file mode for a namespace's objects.
#[cfg(unix)]
fn file_mode(namespace: Namespace) -> u32 {
    if namespace.is_immutable() { 0o400 } else { 0o600 }
}

/// Creates `dir` and any missing parents with mode `0o700`.
fn create_dirs(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
    }
    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)
    }
}

/// Blocking body of `write`: tempfile in the target directory, then rename.
fn write_object(
    path: &Path,
    payload: &[u8],
    mode: WriteMode,
    namespace: Namespace,
) -> std::io::Result<bool> {
    use std::io::Write;

    let parent = path.parent().ok_or_else(|| {
        std::io::Error::other(format!("object path {} has no parent", path.display()))
    })?;
    create_dirs(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(payload)?;
    staged.write_all(b"\n")?;
    staged.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(file_mode(namespace)))?;
    }
    #[cfg(not(unix))]
    let _ = namespace;

    // Returns Ok(true) on success, Ok(false) on a no-clobber conflict.
    match mode {
        WriteMode::Overwrite => {
            staged.persist(path).map_err(|persist| persist.error)?;
            Ok(true)
        },
        WriteMode::CreateOnly => match staged.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(persist) if persist.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(persist) => Err(persist.error),
        },
    }
}

/// Blocking body of `list`: iterative walk below the prefix directory.
fn list_objects(base: &Path, max_keys: usize) -> std::io::Result<Vec<String>> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut keys = Vec::new();
    let mut pending = vec![base.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|ext| ext.to_str()) == Some(OBJECT_EXTENSION) {
                if let Ok(relative) = path.with_extension("").strip_prefix(base) {
                    keys.push(relative.to_string_lossy().into_owned());
                }
            }
        }
    }
    keys.sort();
    keys.truncate(max_keys);
    Ok(keys)
}

/// Runs blocking filesystem work on the blocking pool, flattening join errors.
async fn run_blocking<T: Send + 'static>(
    work: impl FnOnce() -> std::io::Result<T> + Send + 'static,
) -> std::io::Result<T> {
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|join| std::io::Error::other(join.to_string()))?
}

#[async_trait]
impl StorageDriver for LocalDriver {
    async fn exists(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        Self::check_key(namespace, key, "exists")?;
        let path = self.object_path(namespace, key);
        ctx.run("exists", async {
            tokio::fs::try_exists(&path)
                .await
                .context(IoSnafu { namespace, key, method: "exists" })
        })
        .await
    }

    async fn read(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        key: &str,
    ) -> Result<Option<Bytes>> {
        Self::check_key(namespace, key, "read")?;
        let path = self.object_path(namespace, key);
        ctx.run("read", async {
            match tokio::fs::read(&path).await {
                Ok(mut bytes) => {
                    if bytes.last() == Some(&b'\n') {
                        bytes.pop();
                    }
                    Ok(Some(Bytes::from(bytes)))
                },
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(error) => {
                    Err(error).context(IoSnafu { namespace, key, method: "read" })
                },
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
        Self::check_key(namespace, key, "write")?;
        let path = self.object_path(namespace, key);
        ctx.run("write", async {
            let created = run_blocking(move || write_object(&path, &payload, mode, namespace))
                .await
                .context(IoSnafu { namespace, key, method: "write" })?;
            if created {
                Ok(())
            } else {
                Err(DriverError::Conflict { namespace, key: key.to_string() })
            }
        })
        .await
    }

    async fn delete(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        Self::check_key(namespace, key, "delete")?;
        let path = self.object_path(namespace, key);
        ctx.run("delete", async {
            // unlink() is atomic: under concurrent deletes of one key, the
            // kernel hands NotFound to every caller but the winner.
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(true),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(error) => {
                    Err(error).context(IoSnafu { namespace, key, method: "delete" })
                },
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
        if !prefix.is_empty() {
            Self::check_key(namespace, prefix, "list")?;
        }
        let mut base = self.root.join(namespace.as_str());
        if !prefix.is_empty() {
            base = base.join(prefix);
        }
        ctx.run("list", async {
            run_blocking(move || list_objects(&base, max_keys)).await.context(IoSnafu {
                namespace,
                key: prefix,
                method: "list",
            })
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn ctx() -> OpContext {
        OpContext::new()
    }

    #[tokio::test]
    async fn test_write_read_round_trip_strips_trailing_newline() {
        let dir = tempdir().unwrap();
        let driver = LocalDriver::new(dir.path());
        let payload = Bytes::from_static(b"{\"tag\":\"#ABC\"}");

        driver
            .write(&ctx(), Namespace::Drafts, "T123/v1", payload.clone(), WriteMode::Overwrite, None)
            .await
            .unwrap();

        let raw = std::fs::read(dir.path().join("drafts/T123/v1.bali")).unwrap();
        assert_eq!(raw.last(), Some(&b'\n'), "stored file must end with a newline");

        let read_back = driver.read(&ctx(), Namespace::Drafts, "T123/v1").await.unwrap();
        assert_eq!(read_back, Some(payload));
    }

    #[tokio::test]
    async fn test_read_absent_is_none_not_error() {
        let dir = tempdir().unwrap();
        let driver = LocalDriver::new(dir.path());
        assert_eq!(driver.read(&ctx(), Namespace::Documents, "no/v1").await.unwrap(), None);
        assert!(!driver.exists(&ctx(), Namespace::Documents, "no/v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_only_conflict_preserves_original() {
        let dir = tempdir().unwrap();
        let driver = LocalDriver::new(dir.path());
        let original = Bytes::from_static(b"original");

        driver
            .write(&ctx(), Namespace::Names, "a/b/v1", original.clone(), WriteMode::CreateOnly, None)
            .await
            .unwrap();

        let err = driver
            .write(
                &ctx(),
                Namespace::Names,
                "a/b/v1",
                Bytes::from_static(b"usurper"),
                WriteMode::CreateOnly,
                None,
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(driver.read(&ctx(), Namespace::Names, "a/b/v1").await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_readonly_document() {
        // Documents are a staging slot: overwrite must succeed even though
        // the previous file was written 0o400.
        let dir = tempdir().unwrap();
        let driver = LocalDriver::new(dir.path());

        driver
            .write(
                &ctx(),
                Namespace::Documents,
                "T/v1",
                Bytes::from_static(b"one"),
                WriteMode::Overwrite,
                None,
            )
            .await
            .unwrap();
        driver
            .write(
                &ctx(),
                Namespace::Documents,
                "T/v1",
                Bytes::from_static(b"two"),
                WriteMode::Overwrite,
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            driver.read(&ctx(), Namespace::Documents, "T/v1").await.unwrap(),
            Some(Bytes::from_static(b"two"))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_permission_modes_by_class() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let driver = LocalDriver::new(dir.path());
        driver
            .write(
                &ctx(),
                Namespace::Documents,
                "T/v1",
                Bytes::from_static(b"doc"),
                WriteMode::Overwrite,
                None,
            )
            .await
            .unwrap();
        driver
            .write(
                &ctx(),
                Namespace::Drafts,
                "T/v1",
                Bytes::from_static(b"draft"),
                WriteMode::Overwrite,
                None,
            )
            .await
            .unwrap();

        let doc_mode = std::fs::metadata(dir.path().join("documents/T/v1.bali"))
            .unwrap()
            .permissions()
            .mode();
        let draft_mode =
            std::fs::metadata(dir.path().join("drafts/T/v1.bali")).unwrap().permissions().mode();
        assert_eq!(doc_mode & 0o777, 0o400);
        assert_eq!(draft_mode & 0o777, 0o600);

        let dir_mode =
            std::fs::metadata(dir.path().join("documents/T")).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let dir = tempdir().unwrap();
        let driver = LocalDriver::new(dir.path());
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
        assert!(driver.delete(&ctx(), Namespace::Drafts, "T/v1").await.unwrap());
        assert!(!driver.delete(&ctx(), Namespace::Drafts, "T/v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_walks_state_subdirectories() {
        let dir = tempdir().unwrap();
        let driver = LocalDriver::new(dir.path());
        for key in
            ["bag/v1/available/m2/v1", "bag/v1/available/m1/v1", "bag/v1/processing/m9/v1"]
        {
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

        let available =
            driver.list(&ctx(), Namespace::Messages, "bag/v1/available", 16).await.unwrap();
        assert_eq!(available, vec!["m1/v1".to_string(), "m2/v1".to_string()]);

        let empty = driver.list(&ctx(), Namespace::Messages, "bag/v2/available", 16).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_traversal_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let driver = LocalDriver::new(dir.path());
        for bad in ["../escape", "a//b", "/rooted", ""] {
            let err = driver.read(&ctx(), Namespace::Drafts, bad).await.unwrap_err();
            assert!(
                matches!(err, DriverError::Backend { .. }),
                "key {bad:?} must be rejected"
            );
        }
    }
}
