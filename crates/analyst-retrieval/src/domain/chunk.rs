use serde::{Deserialize, Serialize};

/// A contiguous character window of the extracted document text.
///
/// `start_offset` and the length of `text` are counted in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub ordinal: usize,
    pub text: String,
    pub start_offset: usize,
}

impl Chunk {
    pub const fn new(ordinal: usize, text: String, start_offset: usize) -> Self {
        Self {
            ordinal,
            text,
            start_offset,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn end_offset(&self) -> usize {
        self.start_offset + self.char_len()
    }
}
