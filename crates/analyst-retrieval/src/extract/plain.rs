use std::path::Path;

use crate::domain::ExtractedText;
use crate::error::{Result, RetrievalError};
use crate::extract::join_pages;
use crate::ports::TextExtractor;
use crate::ports::extract::has_extension;

const EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown"];
const PAGE_BREAK: char = '\x0c';

/// Plain text and markdown. Form feeds separate pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn supports(&self, path: &Path) -> bool {
        has_extension(path, EXTENSIONS)
    }

    fn extract(&self, path: &Path) -> Result<ExtractedText> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RetrievalError::DocumentNotFound(path.to_path_buf()),
            _ => RetrievalError::Io(e),
        })?;
        let content = String::from_utf8_lossy(&bytes);

        let pages: Vec<String> = content.split(PAGE_BREAK).map(str::to_string).collect();
        let page_count = pages.len();

        Ok(ExtractedText {
            text: join_pages(pages),
            pages: page_count,
            failed_pages: Vec::new(),
        })
    }
}
