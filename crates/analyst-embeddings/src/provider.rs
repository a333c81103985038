//! The provider-agnostic embedding interface.

use std::sync::Arc;

use crate::config::{EmbeddingConfig, ProviderKind};
use crate::error::{EmbeddingError, Result};
use crate::hashing::HashingEmbedder;

pub type Embedding = Vec<f32>;

/// Maps text to fixed-dimension dense vectors.
///
/// Implementations are shared across threads and must not keep per-call
/// mutable state. Expensive model initialisation happens at most once per
/// instance.
pub trait Embedder: Send + Sync {
    /// Embeds `texts` one-to-one, preserving order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    fn embed_one(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed(&[text.to_string()])?;
        ensure_count(1, embeddings.len())?;
        embeddings
            .pop()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

pub(crate) const fn ensure_count(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(EmbeddingError::CountMismatch { expected, actual })
    }
}

pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    config.validate()?;
    match config.provider {
        ProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimension)?)),
        ProviderKind::Fastembed => create_fastembed(config),
    }
}

#[cfg(feature = "fastembed")]
fn create_fastembed(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(crate::fastembed::FastEmbedder::from_config(config)?))
}

#[cfg(not(feature = "fastembed"))]
fn create_fastembed(_config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    Err(EmbeddingError::ProviderUnavailable(
        "fastembed support not compiled in, enable the `fastembed` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_hashing_embedder() {
        let config = EmbeddingConfig {
            provider: ProviderKind::Hashing,
            dimension: 32,
            ..EmbeddingConfig::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 32);
        assert_eq!(embedder.embed_one("cash flow").unwrap().len(), 32);
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let config = EmbeddingConfig {
            provider: ProviderKind::Hashing,
            dimension: 0,
            ..EmbeddingConfig::default()
        };
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn test_ensure_count() {
        assert!(ensure_count(3, 3).is_ok());
        assert!(matches!(
            ensure_count(3, 2),
            Err(EmbeddingError::CountMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
