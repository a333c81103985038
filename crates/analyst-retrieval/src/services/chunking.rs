//! Fixed-size sliding-window chunking over characters.

use crate::config::ChunkingConfig;
use crate::domain::Chunk;

/// Splits `text` into windows of `chunk_size` characters, each starting
/// `chunk_size - overlap` characters after the previous one.
///
/// Chunk `i` starts at character `i * stride`; only the last chunk may be
/// shorter, and no window starts after one has reached the end of the text. Empty text yields no chunks. `config` is assumed valid (see
/// [`ChunkingConfig::validate`]).
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    // Byte offset of every character boundary, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;
    let stride = config.stride().max(1);

    let mut chunks = Vec::with_capacity(char_count.div_ceil(stride));
    let mut start = 0;
    while start < char_count {
        let end = (start + config.chunk_size).min(char_count);
        let slice = &text[boundaries[start]..boundaries[end]];
        chunks.push(Chunk::new(chunks.len(), slice.to_string(), start));
        if end == char_count {
            break;
        }
        start += stride;
    }
    chunks
}

/// Rebuilds the chunked text by dropping the part of each chunk already
/// covered by its predecessor.
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered = 0_usize;
    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.start_offset);
        text.extend(chunk.text.chars().skip(skip));
        covered = covered.max(chunk.end_offset());
    }
    text
}
