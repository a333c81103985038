use std::path::PathBuf;

use analyst_retrieval::Config;
use anyhow::Result;
use clap::{Parser, Subcommand};

mod build;
mod chunk;
mod clean;
mod query;
mod status;

#[derive(Parser)]
#[command(name = "analyst")]
#[command(about = "Semantic index and excerpt retrieval for financial reports")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output as JSON")]
    pub json: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,

    #[arg(long, global = true, help = "Use this config file instead of the global/project ones")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Source document to index (overrides config)")]
    pub source: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Load or build the index for the source document")]
    Build {
        #[arg(long, help = "Rebuild even if a usable index exists")]
        force: bool,
    },

    #[command(about = "Retrieve the excerpts most relevant to a question")]
    Query {
        #[arg(help = "Question to retrieve context for")]
        question: String,

        #[arg(long, help = "Number of excerpts to return (defaults to config)")]
        top_k: Option<usize>,

        #[arg(long, help = "Show row numbers and distances")]
        scores: bool,
    },

    #[command(about = "Show index artifact status")]
    Status,

    #[command(about = "Delete the index artifact files")]
    Clean,

    #[command(about = "Preview how a document is chunked")]
    Chunk {
        #[arg(help = "Document to chunk")]
        file: PathBuf,

        #[arg(long, default_value = "5", help = "Maximum chunks to print")]
        limit: usize,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Commands::Build { force } => build::run(&config, force, cli.json),
        Commands::Query {
            question,
            top_k,
            scores,
        } => query::run(&config, &question, top_k, scores, cli.json),
        Commands::Status => status::run(&config, cli.json),
        Commands::Clean => clean::run(&config, cli.json),
        Commands::Chunk { file, limit } => chunk::run(&config, &file, limit, cli.json),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(source) = &cli.source {
        config.source.document_path.clone_from(source);
    }
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
