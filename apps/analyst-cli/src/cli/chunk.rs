use std::path::Path;

use analyst_retrieval::extract::DocumentReader;
use analyst_retrieval::{Config, chunk_text};
use anyhow::Result;
use serde_json::json;

const PREVIEW_CHARS: usize = 160;

pub fn run(config: &Config, file: &Path, limit: usize, json: bool) -> Result<()> {
    let extracted = DocumentReader::default().read(file)?;
    let chunks = chunk_text(&extracted.text, &config.chunking);

    if json {
        let shown: Vec<_> = chunks.iter().take(limit).collect();
        return super::print_json(&json!({
            "path": file,
            "pages": extracted.pages,
            "failed_pages": extracted.failed_pages,
            "chars": extracted.text.chars().count(),
            "chunk_size": config.chunking.chunk_size,
            "overlap": config.chunking.overlap,
            "total_chunks": chunks.len(),
            "chunks": shown,
        }));
    }

    println!(
        "{}: {} pages, {} chars -> {} chunks ({} chars, {} overlap)",
        file.display(),
        extracted.pages,
        extracted.text.chars().count(),
        chunks.len(),
        config.chunking.chunk_size,
        config.chunking.overlap
    );
    if extracted.is_degraded() {
        println!("  pages without text: {:?}", extracted.failed_pages);
    }

    for chunk in chunks.iter().take(limit) {
        let preview: String = chunk
            .text
            .chars()
            .take(PREVIEW_CHARS)
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .collect();
        println!();
        println!("#{} [{}..{})", chunk.ordinal, chunk.start_offset, chunk.end_offset());
        println!("    {preview}");
    }
    if chunks.len() > limit {
        println!();
        println!("... {} more", chunks.len() - limit);
    }
    Ok(())
}
