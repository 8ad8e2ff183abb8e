mod composite_file_loader;
pub mod form_fields;
mod overlapping_window_splitter;
mod pdf_adapter;
mod pdf_oxide_extractor;
mod plain_text_adapter;
pub mod reading_order;
pub mod table_reflow;
mod text_sanitizer;

pub use composite_file_loader::CompositeFileLoader;
pub use overlapping_window_splitter::OverlappingWindowSplitter;
pub use pdf_adapter::PdfAdapter;
pub use pdf_oxide_extractor::PdfOxideExtractor;
pub use plain_text_adapter::PlainTextAdapter;
pub use text_sanitizer::sanitize_extracted_text;

/// Failure of a best-effort enrichment step; extraction falls back to plain text.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("input too large for enrichment: {size} > {limit}")]
    InputTooLarge { size: usize, limit: usize },
}
