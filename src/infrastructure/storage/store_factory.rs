use std::path::PathBuf;
use std::sync::Arc;

use crate::application::ports::{BlobStore, BlobStoreError};
use crate::presentation::config::{StorageProviderSetting, StorageSettings};

use super::object_blob_store::ObjectBlobStore;

pub struct BlobStoreFactory;

impl BlobStoreFactory {
    pub fn create(settings: &StorageSettings) -> Result<Arc<dyn BlobStore>, BlobStoreError> {
        let store = match settings.provider {
            StorageProviderSetting::Local => {
                ObjectBlobStore::local(PathBuf::from(&settings.local_path))?
            }
            StorageProviderSetting::Memory => ObjectBlobStore::in_memory(),
            StorageProviderSetting::S3 => {
                let bucket = required(&settings.bucket, "bucket")?;
                ObjectBlobStore::s3(
                    bucket,
                    settings.region.as_deref(),
                    settings.endpoint.as_deref(),
                )?
            }
            StorageProviderSetting::Azure => {
                let account = required(&settings.azure_account, "azure_account")?;
                let key = required(&settings.azure_access_key, "azure_access_key")?;
                let container = required(&settings.azure_container, "azure_container")?;
                ObjectBlobStore::azure(account, key, container)?
            }
        };

        tracing::info!(provider = ?settings.provider, "Blob store ready");
        Ok(Arc::new(store))
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, BlobStoreError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BlobStoreError::Configuration(format!("{name} required")))
}
