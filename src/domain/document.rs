use super::StorageKey;

/// A raw upload about to be normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: StorageKey,
    pub content_type: ContentType,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Pdf,
    Text,
}

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "csv", "tsv", "json", "xml", "html", "htm", "log", "eml", "ics", "vcf",
];

impl ContentType {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence {
            "application/pdf" => Some(Self::Pdf),
            "application/json" | "application/xml" | "message/rfc822" => Some(Self::Text),
            m if m.starts_with("text/") => Some(Self::Text),
            _ => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.to_ascii_lowercase();
        if ext == "pdf" {
            Some(Self::Pdf)
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Text)
        } else {
            None
        }
    }

    /// Declared MIME wins; the extension is the fallback for generic uploads.
    pub fn resolve(declared_mime: Option<&str>, extension: &str) -> Option<Self> {
        declared_mime
            .and_then(Self::from_mime)
            .or_else(|| Self::from_extension(extension))
    }

    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Text => "text/plain",
        }
    }
}

impl Document {
    pub fn new(key: StorageKey, content_type: ContentType, size_bytes: u64) -> Self {
        Self {
            key,
            content_type,
            size_bytes,
        }
    }
}
