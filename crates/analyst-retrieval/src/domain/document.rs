/// Text pulled out of a source document together with page accounting.
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub text: String,
    pub pages: usize,
    /// One-based numbers of pages whose extraction failed and were left empty.
    pub failed_pages: Vec<u32>,
}

impl ExtractedText {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        !self.failed_pages.is_empty()
    }
}
