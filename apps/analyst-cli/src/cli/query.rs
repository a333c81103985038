use analyst_retrieval::{Config, Retriever};
use anyhow::Result;
use serde_json::json;

pub fn run(
    config: &Config,
    question: &str,
    top_k: Option<usize>,
    scores: bool,
    json: bool,
) -> Result<()> {
    let retriever = Retriever::from_config(config)?;
    let results = retriever.retrieve_scored(question, top_k)?;

    if json {
        return super::print_json(&json!({
            "query": question,
            "count": results.len(),
            "results": results,
        }));
    }

    if results.is_empty() {
        println!("No excerpts found for: \"{question}\"");
        return Ok(());
    }

    println!();
    println!("Query: \"{question}\"");
    println!("Found: {} excerpts", results.len());

    for result in &results {
        println!();
        if scores {
            println!(
                "[{}] row {} | distance {:.4}",
                result.rank + 1,
                result.row,
                result.distance
            );
        } else {
            println!("[{}]", result.rank + 1);
        }
        for line in result.text.lines().filter(|l| !l.trim().is_empty()) {
            println!("    {}", line.trim_end());
        }
    }
    Ok(())
}
