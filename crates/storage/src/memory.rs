//! In-memory storage driver for testing.
//!
//! All objects live in one process-local map and are lost on drop. Besides
//! being the fast backend for unit tests, the driver counts every primitive
//! call so tests can observe cache behavior (a cached read performs zero
//! driver reads).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use nebula_repository_types::Digest;
use parking_lot::RwLock;

use crate::context::OpContext;
use crate::driver::{DriverError, Namespace, Result, StorageDriver, WriteMode};

/// In-memory storage driver.
#[derive(Debug, Default)]
pub struct InMemoryDriver {
    objects: RwLock<HashMap<(Namespace, String), Bytes>>,
    exists_calls: AtomicU64,
    read_calls: AtomicU64,
    write_calls: AtomicU64,
    delete_calls: AtomicU64,
    list_calls: AtomicU64,
}

impl InMemoryDriver {
    /// Creates an empty driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all namespaces.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Total `exists` calls since creation.
    #[must_use]
    pub fn exists_count(&self) -> u64 {
        self.exists_calls.load(Ordering::Relaxed)
    }

    /// Total `read` calls since creation.
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.read_calls.load(Ordering::Relaxed)
    }

    /// Total `write` calls since creation.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.write_calls.load(Ordering::Relaxed)
    }

    /// Total `delete` calls since creation.
    #[must_use]
    pub fn delete_count(&self) -> u64 {
        self.delete_calls.load(Ordering::Relaxed)
    }

    /// Total `list` calls since creation.
    #[must_use]
    pub fn list_count(&self) -> u64 {
        self.list_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl StorageDriver for InMemoryDriver {
    async fn exists(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::Relaxed);
        let lookup = (namespace, key.to_string());
        ctx.run("exists", async { Ok(self.objects.read().contains_key(&lookup)) }).await
    }

    async fn read(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        key: &str,
    ) -> Result<Option<Bytes>> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        let lookup = (namespace, key.to_string());
        ctx.run("read", async { Ok(self.objects.read().get(&lookup).cloned()) }).await
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
        self.write_calls.fetch_add(1, Ordering::Relaxed);
        let entry = (namespace, key.to_string());
        ctx.run("write", async {
            let mut objects = self.objects.write();
            if mode == WriteMode::CreateOnly && objects.contains_key(&entry) {
                return Err(DriverError::Conflict { namespace, key: key.to_string() });
            }
            objects.insert(entry, payload);
            Ok(())
        })
        .await
    }

    async fn delete(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::Relaxed);
        let entry = (namespace, key.to_string());
        // remove() under the write lock is atomic: exactly one concurrent
        // deleter of the same key observes Some.
        ctx.run("delete", async { Ok(self.objects.write().remove(&entry).is_some()) }).await
    }

    async fn list(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        let relative_start =
            if prefix.is_empty() { String::new() } else { format!("{prefix}/") };
        ctx.run("list", async {
            let objects = self.objects.read();
            let mut keys: Vec<String> = objects
                .keys()
                .filter(|(ns, _)| *ns == namespace)
                .filter_map(|(_, key)| key.strip_prefix(&relative_start))
                .map(str::to_string)
                .collect();
            keys.sort();
            keys.truncate(max_keys);
            Ok(keys)
        })
        .await
    }
}
