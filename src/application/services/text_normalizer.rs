use std::sync::Arc;

use bytes::Bytes;

use crate::application::ports::{
    BlobStore, BlobStoreError, FileLoader, FileLoaderError, TaskDispatcher, TextSplitter,
    TextSplitterError,
};
use crate::domain::{
    ContentType, Document, PipelineTask, Stage, StorageKey, belongs_to_stem, chunk_relative_path,
    split_extension,
};

const NORMALIZED_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeReport {
    pub source: StorageKey,
    pub written: Vec<StorageKey>,
    pub dispatched: Vec<StorageKey>,
    pub dispatch_failures: Vec<(StorageKey, String)>,
}

/// Turns a raw upload into one or more plain-text objects in the `normalized` stage.
pub struct TextNormalizer {
    store: Arc<dyn BlobStore>,
    file_loader: Arc<dyn FileLoader>,
    splitter: Arc<dyn TextSplitter>,
    dispatcher: Arc<dyn TaskDispatcher>,
    handoff: bool,
}

impl TextNormalizer {
    pub fn new(
        store: Arc<dyn BlobStore>,
        file_loader: Arc<dyn FileLoader>,
        splitter: Arc<dyn TextSplitter>,
        dispatcher: Arc<dyn TaskDispatcher>,
    ) -> Self {
        Self {
            store,
            file_loader,
            splitter,
            dispatcher,
            handoff: true,
        }
    }

    /// Disables the categorizer hand-off, for deployments where the store's own
    /// notifications already cover the `normalized` stage.
    pub fn without_handoff(mut self) -> Self {
        self.handoff = false;
        self
    }

    #[tracing::instrument(skip(self, key), fields(user_id = %key.user_id(), key = %key))]
    pub async fn normalize(
        &self,
        key: &StorageKey,
        declared_mime: Option<&str>,
    ) -> Result<NormalizeReport, NormalizeError> {
        if key.stage() != Stage::Raw {
            return Err(NormalizeError::WrongStage(key.to_string()));
        }

        let (stem, extension) = split_extension(key.relative_path());
        let content_type = ContentType::resolve(declared_mime, extension).ok_or_else(|| {
            NormalizeError::Extraction(FileLoaderError::UnsupportedContentType(
                declared_mime.unwrap_or(extension).to_string(),
            ))
        })?;

        let data = self.store.get(&key.to_string()).await?;
        let document = Document::new(key.clone(), content_type, data.len() as u64);
        let text = self.file_loader.extract_text(&data, &document).await?;

        let output_extension = match content_type {
            ContentType::Pdf => "txt",
            ContentType::Text if extension.is_empty() => "txt",
            ContentType::Text => extension,
        };

        let chunks = self.splitter.split(&text)?;
        let written = if chunks.len() <= 1 {
            vec![StorageKey::new(
                key.user_id(),
                Stage::Normalized,
                format!("{stem}.{output_extension}"),
            )]
        } else {
            chunks
                .iter()
                .map(|chunk| {
                    StorageKey::new(
                        key.user_id(),
                        Stage::Normalized,
                        chunk_relative_path(stem, chunk.sequence, output_extension),
                    )
                })
                .collect()
        };

        if chunks.len() <= 1 {
            self.put_text(&written[0], text).await?;
        } else {
            for (target, chunk) in written.iter().zip(chunks) {
                self.put_text(target, chunk.text).await?;
            }
        }

        tracing::info!(
            content_type = content_type.as_mime(),
            outputs = written.len(),
            "Normalized upload"
        );

        let mut report = NormalizeReport {
            source: key.clone(),
            written,
            dispatched: Vec::new(),
            dispatch_failures: Vec::new(),
        };

        if self.handoff {
            self.hand_off(key.user_id(), stem, &mut report).await?;
        }

        Ok(report)
    }

    async fn put_text(&self, target: &StorageKey, text: String) -> Result<(), NormalizeError> {
        self.store
            .put(&target.to_string(), Bytes::from(text), NORMALIZED_CONTENT_TYPE)
            .await?;
        Ok(())
    }

    /// Requests categorization of every normalized object sharing the source's
    /// stem, as a single task so the outputs are categorized in order.
    async fn hand_off(
        &self,
        user_id: &str,
        stem: &str,
        report: &mut NormalizeReport,
    ) -> Result<(), NormalizeError> {
        let prefix = format!("{}{}", StorageKey::stage_prefix(user_id, Stage::Normalized), stem);
        let mut siblings: Vec<StorageKey> = self
            .store
            .list(&prefix)
            .await?
            .into_iter()
            .filter_map(|info| StorageKey::parse(&info.key).ok())
            .filter(|k| k.stage() == Stage::Normalized && belongs_to_stem(k.relative_path(), stem))
            .collect();
        siblings.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));
        if siblings.is_empty() {
            return Ok(());
        }

        let task = PipelineTask::CategorizeSeries {
            source: report.source.clone(),
            keys: siblings.clone(),
        };
        match self.dispatcher.dispatch(task) {
            Ok(()) => report.dispatched = siblings,
            Err(e) => {
                tracing::warn!(error = %e, outputs = siblings.len(), "Failed to hand off normalized outputs");
                let reason = e.to_string();
                report.dispatch_failures = siblings
                    .into_iter()
                    .map(|key| (key, reason.clone()))
                    .collect();
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("not a raw-stage object: {0}")]
    WrongStage(String),
    #[error("storage: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("extraction: {0}")]
    Extraction(#[from] FileLoaderError),
    #[error("chunking: {0}")]
    Chunking(#[from] TextSplitterError),
}
