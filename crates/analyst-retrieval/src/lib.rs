//! # analyst-retrieval
//!
//! Turns a financial report into a persistent semantic index and answers
//! "which excerpts are relevant to this question" against it.
//!
//! Pipeline: [`extract`] -> [`services::chunking`] -> embeddings ->
//! [`index::FlatIndex`], persisted and cached by [`IndexStore`] and queried
//! through [`Retriever`].
//!
//! ```no_run
//! use analyst_retrieval::{Config, Retriever};
//!
//! # fn main() -> analyst_retrieval::Result<()> {
//! let config = Config::load()?;
//! let retriever = Retriever::from_config(&config)?;
//! retriever.ensure_index()?;
//!
//! for excerpt in retriever.retrieve("How did net debt change?", Some(4))? {
//!     println!("{excerpt}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod index;
pub mod ports;
pub mod services;

pub use config::{ArtifactPaths, ChunkingConfig, Config, RetrievalConfig};
pub use domain::{ArtifactStatus, Chunk, LoadedIndex, Manifest, RetrievedChunk};
pub use error::{Result, RetrievalError};
pub use index::FlatIndex;
pub use services::{IndexStore, Retriever, chunk_text};
