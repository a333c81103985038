//! Query-time retrieval: embed the question, search, hydrate chunk texts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use analyst_embeddings::{Embedder, create_embedder};

use crate::config::{Config, RetrievalConfig};
use crate::domain::{LoadedIndex, Neighbor, RetrievedChunk};
use crate::error::{Result, RetrievalError};
use crate::services::index_store::IndexStore;

/// Answers queries against one source document. Queries are embedded with
/// the store's own embedder, so build and query vectors always agree.
pub struct Retriever {
    store: IndexStore,
    source_path: PathBuf,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(store: IndexStore, source_path: impl Into<PathBuf>, config: RetrievalConfig) -> Self {
        Self {
            store,
            source_path: source_path.into(),
            config,
        }
    }

    /// Wires the full stack from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let embedder = create_embedder(&config.embedding)?;
        Self::with_embedder(config, embedder)
    }

    /// Like [`Retriever::from_config`] but with a caller-supplied embedder.
    pub fn with_embedder(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let store = IndexStore::new(config.artifacts.clone(), config.chunking, embedder)?
            .with_batch_size(config.embedding.batch_size);

        Ok(Self::new(
            store,
            config.source.document_path.clone(),
            config.retrieval.clone(),
        ))
    }

    pub const fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub const fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn embedding_model(&self) -> &str {
        self.store.embedder().model_name()
    }

    pub fn ensure_index(&self) -> Result<Arc<LoadedIndex>> {
        self.store.ensure(&self.source_path)
    }

    /// Rebuilds from the configured source document, replacing the cache.
    pub fn rebuild(&self) -> Result<Arc<LoadedIndex>> {
        self.store.rebuild(&self.source_path)
    }

    pub fn invalidate(&self) -> bool {
        self.store.invalidate()
    }

    /// Chunk texts for `query`, best first. `top_k` defaults to the
    /// configured value.
    pub fn retrieve(&self, query: &str, top_k: Option<usize>) -> Result<Vec<String>> {
        Ok(self
            .retrieve_scored(query, top_k)?
            .into_iter()
            .map(|chunk| chunk.text)
            .collect())
    }

    pub fn retrieve_scored(&self, query: &str, top_k: Option<usize>) -> Result<Vec<RetrievedChunk>> {
        let top_k = top_k.unwrap_or(self.config.top_k);
        if top_k == 0 {
            return Err(RetrievalError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }

        let loaded = self.ensure_index()?;
        if loaded.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.store.embedder().embed_one(query)?;
        let neighbors = loaded.index().search(&embedding, top_k)?;
        let results = hydrate(&loaded, &neighbors, self.config.max_distance);

        tracing::info!(
            requested = top_k,
            returned = results.len(),
            "Retrieved chunks for query"
        );
        Ok(results)
    }

    /// Degraded-mode retrieval for collaborators that must keep answering:
    /// any failure is logged and yields no excerpts.
    pub fn retrieve_or_empty(&self, query: &str, top_k: Option<usize>) -> Vec<String> {
        self.retrieve(query, top_k).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Retrieval failed, continuing without document context");
            Vec::new()
        })
    }
}

/// Maps neighbours to chunk texts, skipping rows with no metadata entry and,
/// when `max_distance` is set, hits farther than it.
fn hydrate(
    loaded: &LoadedIndex,
    neighbors: &[Neighbor],
    max_distance: Option<f32>,
) -> Vec<RetrievedChunk> {
    neighbors
        .iter()
        .filter(|n| max_distance.is_none_or(|max| n.distance <= max))
        .filter_map(|n| loaded.text(n.row).map(|text| (n, text)))
        .enumerate()
        .map(|(rank, (n, text))| RetrievedChunk {
            rank,
            row: n.row,
            distance: n.distance,
            text: text.to_string(),
        })
        .collect()
}
