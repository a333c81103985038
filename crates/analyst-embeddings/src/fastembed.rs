//! Local ONNX embeddings via fastembed.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, Result};
use crate::provider::{Embedder, Embedding, ensure_count};

/// Resolves a configured model name to a fastembed model and its dimension.
///
/// Names are matched case-insensitively, with or without an organisation
/// prefix (`sentence-transformers/all-MiniLM-L6-v2`, `BAAI/bge-small-en-v1.5`).
pub fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    let short = name.trim().rsplit('/').next().unwrap_or(name).to_lowercase();
    let short = short.strip_suffix("-onnx").unwrap_or(&short);

    match short {
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "all-minilm-l12-v2" => Ok((EmbeddingModel::AllMiniLML12V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        "bge-large-en-v1.5" => Ok((EmbeddingModel::BGELargeENV15, 1024)),
        "nomic-embed-text-v1.5" => Ok((EmbeddingModel::NomicEmbedTextV15, 768)),
        _ => Err(EmbeddingError::UnknownModel(name.to_string())),
    }
}

pub struct FastEmbedder {
    model_name: String,
    model: EmbeddingModel,
    dimension: usize,
    batch_size: usize,
    cache_dir: Option<PathBuf>,
    show_download_progress: bool,
    instance: Mutex<Option<Arc<TextEmbedding>>>,
}

impl FastEmbedder {
    /// Resolves the model eagerly but defers loading it until first use.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dimension) = resolve_model(&config.model_name)?;
        Ok(Self {
            model_name: config.model_name.clone(),
            model,
            dimension,
            batch_size: config.batch_size,
            cache_dir: config.cache_dir.clone(),
            show_download_progress: config.show_download_progress,
            instance: Mutex::new(None),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.instance.lock().is_ok_and(|slot| slot.is_some())
    }

    /// Returns the shared model, loading it on first call.
    ///
    /// The lock is held while loading so concurrent first callers wait for a
    /// single load. A failed load leaves the slot empty.
    fn instance(&self) -> Result<Arc<TextEmbedding>> {
        let mut slot = self.instance.lock().map_err(|_| EmbeddingError::ModelLoad {
            model: self.model_name.clone(),
            message: "model lock poisoned".to_string(),
        })?;

        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        tracing::info!(model = %self.model_name, "Loading embedding model");
        let mut options = InitOptions::default();
        options.model_name = self.model.clone();
        options.show_download_progress = self.show_download_progress;
        if let Some(dir) = &self.cache_dir {
            options.cache_dir.clone_from(dir);
        }

        let model = TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelLoad {
            model: self.model_name.clone(),
            message: e.to_string(),
        })?;
        tracing::info!(model = %self.model_name, dimension = self.dimension, "Embedding model loaded");

        let model = Arc::new(model);
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.instance()?;
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = model
            .embed(inputs, Some(self.batch_size))
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        ensure_count(texts.len(), embeddings.len())?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
