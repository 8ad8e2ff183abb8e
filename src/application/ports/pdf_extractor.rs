use super::FileLoaderError;

/// A positioned run of text. `y` grows downwards from the top of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    pub number: u32,
    pub fragments: Vec<TextFragment>,
}

/// Low-level PDF parser: bytes in, positioned fragments out. Blocking.
pub trait PdfExtractor: Send + Sync {
    fn extract(&self, data: &[u8]) -> Result<Vec<PdfPage>, FileLoaderError>;
}
