use std::fmt;

use serde::{Deserialize, Serialize};

use super::StorageKey;

/// Storage-change notification as delivered by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEvent {
    #[serde(default)]
    pub bucket: String,
    pub key: String,
    #[serde(default)]
    pub size_bytes: u64,
}

impl StorageEvent {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            size_bytes,
        }
    }
}

/// Unit of work handed to a downstream processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineTask {
    Normalize(StorageKey),
    Categorize(StorageKey),
    /// Every normalized output of one upload, categorized in order.
    CategorizeSeries {
        source: StorageKey,
        keys: Vec<StorageKey>,
    },
    BuildPersonas(StorageKey),
}

impl PipelineTask {
    pub fn key(&self) -> &StorageKey {
        match self {
            PipelineTask::Normalize(key)
            | PipelineTask::Categorize(key)
            | PipelineTask::BuildPersonas(key) => key,
            PipelineTask::CategorizeSeries { source, .. } => source,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineTask::Normalize(_) => "normalize",
            PipelineTask::Categorize(_) => "categorize",
            PipelineTask::CategorizeSeries { .. } => "categorize_series",
            PipelineTask::BuildPersonas(_) => "build_personas",
        }
    }
}

impl fmt::Display for PipelineTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_str(), self.key())
    }
}
