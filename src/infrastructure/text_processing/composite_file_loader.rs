use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::{FileLoader, FileLoaderError, PdfExtractor};
use crate::domain::{ContentType, Document};

use super::pdf_adapter::PdfAdapter;
use super::plain_text_adapter::PlainTextAdapter;

/// Routes each document to the loader registered for its content type.
pub struct CompositeFileLoader {
    adapters: HashMap<ContentType, Arc<dyn FileLoader>>,
}

impl CompositeFileLoader {
    pub fn new(adapters: Vec<(ContentType, Arc<dyn FileLoader>)>) -> Self {
        Self {
            adapters: adapters.into_iter().collect(),
        }
    }

    /// PDF through `extractor`, everything textual through [`PlainTextAdapter`].
    pub fn standard(extractor: Arc<dyn PdfExtractor>) -> Self {
        Self::new(vec![
            (ContentType::Pdf, Arc::new(PdfAdapter::new(extractor))),
            (ContentType::Text, Arc::new(PlainTextAdapter)),
        ])
    }
}

#[async_trait]
impl FileLoader for CompositeFileLoader {
    async fn extract_text(
        &self,
        data: &[u8],
        document: &Document,
    ) -> Result<String, FileLoaderError> {
        let adapter = self.adapters.get(&document.content_type).ok_or_else(|| {
            FileLoaderError::UnsupportedContentType(document.content_type.as_mime().to_string())
        })?;

        tracing::debug!(content_type = document.content_type.as_mime(), "Extracting text");
        adapter.extract_text(data, document).await
    }
}
