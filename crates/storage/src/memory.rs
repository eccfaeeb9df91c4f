//! In-memory remote store
//!
//! Behaves like the S3 backend (bucket-per-namespace, write-once keys,
//! missing bucket reads as an empty listing) without any network. Used to
//! substitute the real provider in unit and integration tests.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use trainer_core::{Error, Result};
use tracing::debug;

use crate::store::{persist_to, RemoteStore};

type Buckets = HashMap<String, BTreeMap<String, Bytes>>;

/// In-memory store keyed by namespace, then storage key
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    buckets: Arc<RwLock<Buckets>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch an object's content directly, bypassing the trait
    pub fn get(&self, namespace: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .read()
            .get(namespace)
            .and_then(|bucket| bucket.get(key))
            .cloned()
    }

    /// Seed an object directly, bypassing the trait
    pub fn insert(&self, namespace: &str, key: &str, data: impl Into<Bytes>) {
        self.buckets
            .write()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), data.into());
    }

    /// Snapshot all objects for a namespace in key order
    pub fn objects(&self, namespace: &str) -> Vec<(String, Bytes)> {
        self.buckets
            .read()
            .get(namespace)
            .map(|bucket| {
                bucket
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of objects held for a namespace
    pub fn object_count(&self, namespace: &str) -> usize {
        self.buckets
            .read()
            .get(namespace)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        self.buckets
            .write()
            .entry(namespace.to_string())
            .or_default();
        Ok(())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>> {
        Ok(self
            .buckets
            .read()
            .get(namespace)
            .map(|bucket| bucket.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn upload(&self, namespace: &str, key: &str, local_path: &Path) -> Result<()> {
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("failed to open {:?} for upload: {}", local_path, e),
            })?;

        let mut buckets = self.buckets.write();
        let bucket = buckets
            .get_mut(namespace)
            .ok_or_else(|| Error::Storage {
                message: format!("no such bucket for namespace {}", namespace),
            })?;

        debug!(namespace, key, size = data.len(), "Stored object in memory");
        bucket.insert(key.to_string(), Bytes::from(data));
        Ok(())
    }

    async fn download(&self, namespace: &str, key: &str, local_path: &Path) -> Result<()> {
        let data = self
            .get(namespace, key)
            .ok_or_else(|| Error::KeyNotFound {
                key: key.to_string(),
            })?;

        persist_to(local_path, &data).await
    }
}
