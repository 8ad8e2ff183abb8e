use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::application::ports::{BlobStore, BlobStoreError, ObjectInfo};
use crate::domain::{Stage, StorageEvent, StorageKey};

/// Emits a [`StorageEvent`] after every successful write to a watched stage,
/// the way a bucket notification would.
pub struct NotifyingBlobStore {
    inner: Arc<dyn BlobStore>,
    bucket: String,
    stages: Vec<Stage>,
    sender: mpsc::Sender<StorageEvent>,
}

impl NotifyingBlobStore {
    pub fn new(
        inner: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        stages: Vec<Stage>,
        sender: mpsc::Sender<StorageEvent>,
    ) -> Self {
        Self {
            inner,
            bucket: bucket.into(),
            stages,
            sender,
        }
    }

    fn notify(&self, key: &str, size: u64) {
        let watched = StorageKey::parse(key)
            .map(|k| self.stages.contains(&k.stage()))
            .unwrap_or(false);
        if !watched {
            return;
        }

        let event = StorageEvent::new(self.bucket.clone(), key, size);
        if let Err(e) = self.sender.try_send(event) {
            tracing::warn!(key = %key, error = %e, "Dropped storage notification");
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for NotifyingBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), BlobStoreError> {
        let size = bytes.len() as u64;
        self.inner.put(key, bytes, content_type).await?;
        self.notify(key, size);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, BlobStoreError> {
        self.inner.get(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, BlobStoreError> {
        self.inner.list(prefix).await
    }

    async fn head(&self, key: &str) -> Result<u64, BlobStoreError> {
        self.inner.head(key).await
    }
}
