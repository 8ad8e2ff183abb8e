use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};

use crate::application::ports::{BlobStore, BlobStoreError, ObjectInfo};

/// [`BlobStore`] over any `object_store` backend.
pub struct ObjectBlobStore {
    inner: Arc<dyn ObjectStore>,
    supports_attributes: bool,
}

impl ObjectBlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>, supports_attributes: bool) -> Self {
        Self {
            inner,
            supports_attributes,
        }
    }

    pub fn local(base_path: PathBuf) -> Result<Self, BlobStoreError> {
        std::fs::create_dir_all(&base_path)?;
        let fs = LocalFileSystem::new_with_prefix(base_path)
            .map_err(|e| BlobStoreError::Configuration(e.to_string()))?;
        // The local backend rejects object attributes.
        Ok(Self::new(Arc::new(fs), false))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), true)
    }

    pub fn s3(
        bucket: &str,
        region: Option<&str>,
        endpoint: Option<&str>,
    ) -> Result<Self, BlobStoreError> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }
        let store = builder
            .build()
            .map_err(|e| BlobStoreError::Configuration(e.to_string()))?;
        Ok(Self::new(Arc::new(store), true))
    }

    pub fn azure(account: &str, access_key: &str, container: &str) -> Result<Self, BlobStoreError> {
        let store = MicrosoftAzureBuilder::new()
            .with_account(account)
            .with_access_key(access_key)
            .with_container_name(container)
            .build()
            .map_err(|e| BlobStoreError::Configuration(e.to_string()))?;
        Ok(Self::new(Arc::new(store), true))
    }
}

fn map_read_error(key: &str, e: object_store::Error) -> BlobStoreError {
    match e {
        object_store::Error::NotFound { .. } => BlobStoreError::NotFound(key.to_string()),
        other => BlobStoreError::DownloadFailed(other.to_string()),
    }
}

/// object_store prefixes match whole path segments; split off the partial last segment.
fn listing_root(prefix: &str) -> Option<StorePath> {
    let dir = match prefix.rfind('/') {
        Some(idx) => &prefix[..idx],
        None => "",
    };
    if dir.is_empty() {
        None
    } else {
        Some(StorePath::from(dir))
    }
}

#[async_trait::async_trait]
impl BlobStore for ObjectBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), BlobStoreError> {
        let location = StorePath::from(key);
        let mut options = PutOptions::default();
        if self.supports_attributes {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            options.attributes = attributes;
        }

        self.inner
            .put_opts(&location, PutPayload::from(bytes), options)
            .await
            .map_err(|e| BlobStoreError::UploadFailed(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, BlobStoreError> {
        let location = StorePath::from(key);
        let result = self
            .inner
            .get(&location)
            .await
            .map_err(|e| map_read_error(key, e))?;

        result
            .bytes()
            .await
            .map_err(|e| BlobStoreError::DownloadFailed(e.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, BlobStoreError> {
        let root = listing_root(prefix);
        let metas: Vec<object_store::ObjectMeta> = self
            .inner
            .list(root.as_ref())
            .try_collect()
            .await
            .map_err(|e| BlobStoreError::ListFailed(e.to_string()))?;

        let mut objects: Vec<ObjectInfo> = metas
            .into_iter()
            .map(|meta| ObjectInfo {
                key: meta.location.to_string(),
                size: meta.size as u64,
                last_modified: meta.last_modified,
            })
            .filter(|info| info.key.starts_with(prefix))
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn head(&self, key: &str) -> Result<u64, BlobStoreError> {
        let location = StorePath::from(key);
        let meta = self
            .inner
            .head(&location)
            .await
            .map_err(|e| map_read_error(key, e))?;
        Ok(meta.size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_partial_segment_prefix_when_listing_then_root_is_parent_directory() {
        assert_eq!(listing_root("u/normalized/rep"), Some(StorePath::from("u/normalized")));
        assert_eq!(listing_root("u/normalized/"), Some(StorePath::from("u/normalized")));
        assert_eq!(listing_root("u"), None);
    }
}
