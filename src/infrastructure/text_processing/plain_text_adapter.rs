use async_trait::async_trait;

use crate::application::ports::{FileLoader, FileLoaderError};
use crate::domain::{ContentType, Document};

const UTF8_BOM: &str = "\u{feff}";

/// Decodes text uploads. Invalid UTF-8 sequences become U+FFFD instead of failing.
pub struct PlainTextAdapter;

#[async_trait]
impl FileLoader for PlainTextAdapter {
    async fn extract_text(
        &self,
        data: &[u8],
        document: &Document,
    ) -> Result<String, FileLoaderError> {
        if document.content_type != ContentType::Text {
            return Err(FileLoaderError::UnsupportedContentType(
                document.content_type.as_mime().to_string(),
            ));
        }

        let text = String::from_utf8_lossy(data);
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text);
        if text.trim().is_empty() {
            return Err(FileLoaderError::NoTextFound(document.key.file_name().to_string()));
        }
        Ok(text.to_string())
    }
}
