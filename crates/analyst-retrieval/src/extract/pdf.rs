use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use crate::domain::ExtractedText;
use crate::error::{Result, RetrievalError};
use crate::extract::join_pages;
use crate::ports::TextExtractor;
use crate::ports::extract::has_extension;

/// PDF text extraction.
///
/// The text layer is read with pdf-extract first, which resolves ToUnicode
/// maps and embedded font encodings. When it errors, panics, or yields no text
/// at all, pages are read one at a time with lopdf so a single bad page only
/// costs that page.
#[derive(Debug, Clone, Copy)]
pub struct PdfExtractor {
    font_aware: bool,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self { font_aware: true }
    }
}

impl PdfExtractor {
    /// Skips pdf-extract and reads every page with lopdf.
    pub const fn page_wise() -> Self {
        Self { font_aware: false }
    }

    fn extraction_error(path: &Path, message: impl Into<String>) -> RetrievalError {
        RetrievalError::Extraction {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Whole-document extraction with pdf-extract. `None` means fall back.
    fn font_aware_pages(path: &Path) -> Option<Vec<String>> {
        // pdf-extract panics on some malformed fonts
        let outcome = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path)));
        match outcome {
            Ok(Ok(pages)) if pages.iter().any(|page| !page.trim().is_empty()) => Some(pages),
            Ok(Ok(_)) => {
                tracing::debug!(path = %path.display(), "pdf-extract found no text, reading pages with lopdf");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "pdf-extract failed, reading pages with lopdf");
                None
            }
            Err(_) => {
                tracing::warn!(path = %path.display(), "pdf-extract panicked, reading pages with lopdf");
                None
            }
        }
    }

    /// Reads each page on its own, recording the pages that could not be read.
    fn page_wise_text(document: &lopdf::Document) -> ExtractedText {
        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        let mut failed_pages = Vec::new();
        let mut pages = Vec::with_capacity(page_numbers.len());

        for page_number in &page_numbers {
            // lopdf can panic on malformed content streams; treat that like any
            // other page failure.
            let outcome = catch_unwind(AssertUnwindSafe(|| document.extract_text(&[*page_number])));
            match outcome {
                Ok(Ok(text)) => pages.push(text),
                Ok(Err(e)) => {
                    tracing::warn!(page = page_number, error = %e, "Skipping unreadable PDF page");
                    failed_pages.push(*page_number);
                    pages.push(String::new());
                }
                Err(_) => {
                    tracing::warn!(page = page_number, "PDF page extraction panicked, skipping");
                    failed_pages.push(*page_number);
                    pages.push(String::new());
                }
            }
        }

        tracing::debug!(pages = page_numbers.len(), failed = failed_pages.len(), "PDF pages processed");

        ExtractedText {
            text: join_pages(pages),
            pages: page_numbers.len(),
            failed_pages,
        }
    }
}

impl TextExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    fn extract(&self, path: &Path) -> Result<ExtractedText> {
        if !path.is_file() {
            return Err(RetrievalError::DocumentNotFound(path.to_path_buf()));
        }

        let document = lopdf::Document::load(path)
            .map_err(|e| Self::extraction_error(path, format!("failed to parse PDF: {e}")))?;
        if document.is_encrypted() {
            return Err(Self::extraction_error(path, "PDF is encrypted"));
        }

        if self.font_aware
            && let Some(pages) = Self::font_aware_pages(path)
        {
            tracing::debug!(pages = pages.len(), "PDF text layer read with pdf-extract");
            return Ok(ExtractedText {
                pages: pages.len(),
                text: join_pages(pages),
                failed_pages: Vec::new(),
            });
        }

        Ok(Self::page_wise_text(&document))
    }
}
