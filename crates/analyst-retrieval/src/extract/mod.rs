//! Source document readers.

mod pdf;
mod plain;

use std::fs::File;
use std::path::Path;

pub use pdf::PdfExtractor;
pub use plain::PlainTextExtractor;

use crate::domain::ExtractedText;
use crate::error::{Result, RetrievalError};
use crate::ports::TextExtractor;

/// Dispatches a document to the first registered extractor that supports it.
pub struct DocumentReader {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl Default for DocumentReader {
    fn default() -> Self {
        Self::empty()
            .with_extractor(PdfExtractor::default())
            .with_extractor(PlainTextExtractor)
    }
}

impl DocumentReader {
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: impl TextExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn read(&self, path: &Path) -> Result<ExtractedText> {
        if !path.is_file() {
            return Err(RetrievalError::DocumentNotFound(path.to_path_buf()));
        }

        let extractor = self
            .extractors
            .iter()
            .find(|e| e.supports(path))
            .ok_or_else(|| RetrievalError::UnsupportedDocument(path.to_path_buf()))?;

        tracing::info!(path = %path.display(), extractor = extractor.name(), "Reading source document");
        let extracted = extractor.extract(path)?;

        if extracted.is_degraded() {
            tracing::warn!(
                path = %path.display(),
                failed = extracted.failed_pages.len(),
                pages = extracted.pages,
                "Some pages could not be extracted and were left empty"
            );
        }
        tracing::info!(
            pages = extracted.pages,
            chars = extracted.text.chars().count(),
            "Extracted document text"
        );

        Ok(extracted)
    }
}

/// blake3 digest of a file's bytes, hex encoded.
pub fn hash_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(RetrievalError::DocumentNotFound(path.to_path_buf()));
    }
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Concatenates page texts in order, each non-empty page followed by a
/// newline.
pub(crate) fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut text = String::new();
    for page in pages {
        if !page.is_empty() {
            text.push_str(&page);
            text.push('\n');
        }
    }
    text
}
