use std::time::Instant;

use analyst_retrieval::{Config, Retriever};
use anyhow::Result;
use serde_json::json;

pub fn run(config: &Config, force: bool, json: bool) -> Result<()> {
    let retriever = Retriever::from_config(config)?;
    let started = Instant::now();

    let loaded = if force {
        retriever.rebuild()?
    } else {
        retriever.ensure_index()?
    };
    let elapsed = started.elapsed();

    if json {
        return super::print_json(&json!({
            "source": retriever.source_path(),
            "index_path": config.artifacts.index_path,
            "metadata_path": config.artifacts.metadata_path,
            "rows": loaded.len(),
            "dimension": loaded.dimension(),
            "manifest": loaded.manifest(),
            "elapsed_ms": u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }));
    }

    println!("Index ready: {} chunks, dimension {}", loaded.len(), loaded.dimension());
    println!("  source:   {}", retriever.source_path().display());
    println!("  index:    {}", config.artifacts.index_path.display());
    println!("  metadata: {}", config.artifacts.metadata_path.display());
    match loaded.manifest() {
        Some(manifest) => println!(
            "  model:    {} (built {})",
            manifest.embedding_model,
            manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("  model:    unknown (no manifest)"),
    }
    println!("  took {:.2}s", elapsed.as_secs_f64());
    Ok(())
}
