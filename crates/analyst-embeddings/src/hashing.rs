//! Model-free embeddings built by feature hashing.
//!
//! Each lower-cased alphanumeric token is hashed with blake3 into one signed
//! bucket and the resulting vector is L2-normalised, so squared L2 distance
//! between two outputs is `2 - 2 * cosine`. Useful offline and in tests where
//! downloading a model is not an option.

use crate::error::{EmbeddingError, Result};
use crate::provider::{Embedder, Embedding};

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::Config(
                "hashing dimension must be positive".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_name: format!("hashing-{dimension}"),
        })
    }

    #[allow(clippy::cast_possible_truncation)] // bucket < dimension, which is a usize
    fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0_f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();

            let mut head = [0_u8; 8];
            head.copy_from_slice(&bytes[..8]);
            let bucket = (u64::from_le_bytes(head) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn embed_one(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
