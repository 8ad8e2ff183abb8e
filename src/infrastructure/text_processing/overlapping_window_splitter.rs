use crate::application::ports::{TextSplitter, TextSplitterError};
use crate::domain::Chunk;

/// Fixed-size character windows where each window repeats the last
/// `overlap` characters of the previous one. Text that fits in one window
/// comes back as a single chunk.
#[derive(Debug, Clone, Copy)]
pub struct OverlappingWindowSplitter {
    size: usize,
    overlap: usize,
}

impl OverlappingWindowSplitter {
    pub fn new(size: usize, overlap: usize) -> Result<Self, TextSplitterError> {
        if size == 0 || overlap >= size {
            return Err(TextSplitterError::InvalidWindow { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl TextSplitter for OverlappingWindowSplitter {
    fn split(&self, text: &str) -> Result<Vec<Chunk>, TextSplitterError> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        if total <= self.size {
            return Ok(vec![Chunk::new(1, text.to_string(), 0)]);
        }

        let mut chunks = Vec::with_capacity(total / (self.size - self.overlap) + 1);
        let mut start = 0;
        loop {
            let end = (start + self.size).min(total);
            let window: String = chars[start..end].iter().collect();
            chunks.push(Chunk::new(chunks.len() + 1, window, start));
            if end == total {
                break;
            }
            start = end - self.overlap;
        }

        Ok(chunks)
    }
}
