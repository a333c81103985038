use analyst_retrieval::{Config, Retriever};
use anyhow::Result;
use serde_json::json;

pub fn run(config: &Config, json: bool) -> Result<()> {
    let retriever = Retriever::from_config(config)?;
    let removed = retriever.store().clear_artifacts()?;

    if json {
        return super::print_json(&json!({ "removed": removed }));
    }

    if removed == 0 {
        println!("Nothing to remove.");
    } else {
        println!("Removed {removed} artifact file(s).");
    }
    Ok(())
}
