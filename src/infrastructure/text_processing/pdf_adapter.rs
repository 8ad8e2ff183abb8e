use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{FileLoader, FileLoaderError, PdfExtractor};
use crate::domain::{ContentType, Document};

use super::form_fields::{extract_form_fields, render_preamble};
use super::reading_order::render_in_reading_order;
use super::table_reflow::{TextBlock, detect_tables, render_table};
use super::text_sanitizer::sanitize_extracted_text;
use super::EnrichmentError;

const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns PDF bytes into reading-ordered, sanitized text with a form-field
/// preamble and re-flowed tables when those can be detected.
pub struct PdfAdapter {
    extractor: Arc<dyn PdfExtractor>,
    timeout: Duration,
}

impl PdfAdapter {
    pub fn new(extractor: Arc<dyn PdfExtractor>) -> Self {
        Self {
            extractor,
            timeout: EXTRACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn enrich(ordered: &str) -> Result<String, EnrichmentError> {
    let body = detect_tables(ordered)?
        .into_iter()
        .map(|block| match block {
            TextBlock::Prose(text) => sanitize_extracted_text(&text),
            TextBlock::Table(rows) => {
                let cleaned: Vec<Vec<String>> = rows
                    .iter()
                    .map(|row| row.iter().map(|c| sanitize_extracted_text(c)).collect())
                    .collect();
                render_table(&cleaned)
            }
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let fields = extract_form_fields(&body)?;
    Ok(match render_preamble(&fields) {
        Some(preamble) => format!("{preamble}\n{body}"),
        None => body,
    })
}

#[async_trait]
impl FileLoader for PdfAdapter {
    #[tracing::instrument(skip(self, data, document), fields(key = %document.key, size = document.size_bytes))]
    async fn extract_text(
        &self,
        data: &[u8],
        document: &Document,
    ) -> Result<String, FileLoaderError> {
        if document.content_type != ContentType::Pdf {
            return Err(FileLoaderError::UnsupportedContentType(
                document.content_type.as_mime().to_string(),
            ));
        }

        let extractor = Arc::clone(&self.extractor);
        let bytes = data.to_vec();
        let pages = tokio::time::timeout(
            self.timeout,
            tokio::task::spawn_blocking(move || extractor.extract(&bytes)),
        )
        .await
        .map_err(|_| FileLoaderError::ExtractionFailed("PDF extraction timed out".to_string()))?
        .map_err(|e| FileLoaderError::ExtractionFailed(format!("task join error: {e}")))??;

        let page_count = pages.len();
        let ordered = render_in_reading_order(pages);

        let text = match enrich(&ordered) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "PDF enrichment failed, keeping plain extraction");
                sanitize_extracted_text(&ordered)
            }
        };

        tracing::info!(page_count, chars = text.chars().count(), "PDF text extraction complete");

        if text.trim().is_empty() {
            return Err(FileLoaderError::NoTextFound(document.key.file_name().to_string()));
        }
        Ok(text)
    }
}
