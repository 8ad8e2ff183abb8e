use std::io::Write;

use pdf_oxide::PdfDocument;
use pdf_oxide::layout::TextSpan;

use crate::application::ports::{FileLoaderError, PdfExtractor, PdfPage, TextFragment};

/// Vertical distance assigned between consecutive lines of the text fallback.
const LINE_PITCH: f32 = 12.0;

/// [`PdfExtractor`] backed by `pdf_oxide`. Positioned spans are the primary
/// source; a page whose spans cannot be read falls back to its plain text.
#[derive(Debug, Default)]
pub struct PdfOxideExtractor;

impl PdfOxideExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PdfExtractor for PdfOxideExtractor {
    fn extract(&self, data: &[u8]) -> Result<Vec<PdfPage>, FileLoaderError> {
        let mut temp_file = tempfile::NamedTempFile::new().map_err(|e| {
            FileLoaderError::ExtractionFailed(format!("failed to create temp file: {e}"))
        })?;
        temp_file.write_all(data).map_err(|e| {
            FileLoaderError::ExtractionFailed(format!("failed to write temp file: {e}"))
        })?;

        let doc = PdfDocument::open(temp_file.path())
            .map_err(|e| FileLoaderError::ExtractionFailed(format!("failed to parse PDF: {e}")))?;
        let page_count = doc.page_count().map_err(|e| {
            FileLoaderError::ExtractionFailed(format!("failed to read page count: {e}"))
        })?;

        let mut pages = Vec::with_capacity(page_count);
        for page_index in 0..page_count {
            let fragments = match doc.extract_spans(page_index) {
                Ok(spans) => fragments_from_spans(&spans),
                Err(e) => {
                    tracing::debug!(page = page_index + 1, error = %e, "Span extraction failed, using page text");
                    match doc.extract_text(page_index) {
                        Ok(text) => fragments_from_text(&text),
                        Err(e) => {
                            tracing::warn!(page = page_index + 1, error = %e, "Skipping unreadable PDF page");
                            continue;
                        }
                    }
                }
            };

            pages.push(PdfPage {
                number: (page_index + 1) as u32,
                fragments,
            });
        }

        Ok(pages)
    }
}

fn fragments_from_spans(spans: &[TextSpan]) -> Vec<TextFragment> {
    spans
        .iter()
        .filter_map(|span| fragment_at(span.bbox.x, span.bbox.y, &span.text))
        .collect()
}

/// PDF space grows upward from the bottom of the page; fragments grow downward.
fn fragment_at(x: f32, pdf_y: f32, text: &str) -> Option<TextFragment> {
    if text.trim().is_empty() {
        return None;
    }
    Some(TextFragment {
        x,
        y: -pdf_y,
        text: text.to_string(),
    })
}

fn fragments_from_text(text: &str) -> Vec<TextFragment> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| TextFragment {
            x: 0.0,
            y: index as f32 * LINE_PITCH,
            text: line.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::text_processing::reading_order::render_in_reading_order;

    #[test]
    fn given_spans_in_content_order_when_rendered_then_top_line_first_and_left_to_right() {
        // Content order: footer, right cell, heading, left cell.
        let fragments: Vec<TextFragment> = [
            (72.0, 40.0, "Page 1"),
            (300.0, 700.0, "Lovelace"),
            (72.0, 760.0, "Intake form"),
            (72.0, 700.5, "Name: Ada"),
            (90.0, 500.0, "   "),
        ]
        .into_iter()
        .filter_map(|(x, y, text)| fragment_at(x, y, text))
        .collect();

        assert_eq!(fragments.len(), 4);
        let text = render_in_reading_order(vec![PdfPage {
            number: 1,
            fragments,
        }]);
        let heading = text.find("Intake form").unwrap();
        let name = text.find("Name: Ada Lovelace").unwrap();
        let footer = text.find("Page 1").unwrap();
        assert!(heading < name && name < footer);
    }

    #[test]
    fn given_plain_page_text_when_falling_back_then_lines_keep_their_order() {
        let fragments = fragments_from_text("first\n\nsecond\n");
        let lines: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(lines, vec!["first", "second"]);
        assert!(fragments[0].y < fragments[1].y);
    }
}
