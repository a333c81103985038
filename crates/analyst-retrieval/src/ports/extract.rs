use std::path::Path;

use crate::domain::ExtractedText;
use crate::error::Result;

pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, path: &Path) -> bool;

    /// Extracts text page by page. A page that fails contributes no text and
    /// is recorded in [`ExtractedText::failed_pages`]; only a document that
    /// cannot be opened at all is an error.
    fn extract(&self, path: &Path) -> Result<ExtractedText>;
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}
