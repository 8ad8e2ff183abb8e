use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Listing entry for a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Key-value blob storage. Every `put` is a single atomic overwrite.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), BlobStoreError>;

    async fn get(&self, key: &str) -> Result<Bytes, BlobStoreError>;

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, BlobStoreError>;

    async fn head(&self, key: &str) -> Result<u64, BlobStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("list failed: {0}")]
    ListFailed(String),
    #[error("store configuration invalid: {0}")]
    Configuration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobStoreError::NotFound(_))
    }
}
