use analyst_retrieval::extract::hash_file;
use analyst_retrieval::{Config, Retriever};
use anyhow::Result;

fn yes_no(flag: bool) -> &'static str {
    if flag { "present" } else { "missing" }
}

pub fn run(config: &Config, json: bool) -> Result<()> {
    let retriever = Retriever::from_config(config)?;
    let status = retriever.store().status()?;

    if json {
        return super::print_json(&status);
    }

    println!("Source:   {}", retriever.source_path().display());
    println!("Index:    {} ({})", status.index_path.display(), yes_no(status.index_exists));
    println!(
        "Metadata: {} ({})",
        status.metadata_path.display(),
        yes_no(status.metadata_exists)
    );

    let Some(manifest) = &status.manifest else {
        println!("Manifest: {} (missing)", status.manifest_path.display());
        if status.is_present() {
            println!("  Index was built without a manifest and is trusted as-is.");
        } else {
            println!("  Run `analyst build` to create the index.");
        }
        return Ok(());
    };

    println!("Manifest: {}", status.manifest_path.display());
    println!("  rows:       {}", manifest.rows);
    println!("  dimension:  {}", manifest.dimension);
    println!("  model:      {}", manifest.embedding_model);
    println!(
        "  chunking:   {} chars, {} overlap",
        manifest.chunk_size, manifest.chunk_overlap
    );
    println!("  source:     {}", manifest.source_path.display());
    println!("  built at:   {}", manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC"));

    let source_hash = hash_file(retriever.source_path()).ok();
    if let Some(reason) = manifest.stale_reason(
        retriever.embedding_model(),
        &config.chunking,
        source_hash.as_deref(),
    ) {
        println!("  stale:      {reason}");
    }
    Ok(())
}
