/// A window of normalized text. `offset` is the character offset into the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub sequence: usize,
    pub text: String,
    pub offset: usize,
}

impl Chunk {
    pub fn new(sequence: usize, text: String, offset: usize) -> Self {
        Self {
            sequence,
            text,
            offset,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
