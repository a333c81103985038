use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_BATCH_SIZE: usize = 64;
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Fastembed,
    Hashing,
}

impl FromStr for ProviderKind {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fastembed" | "onnx" => Ok(Self::Fastembed),
            "hashing" | "hash" => Ok(Self::Hashing),
            other => Err(EmbeddingError::Config(format!(
                "unknown embedding provider '{other}' (expected fastembed or hashing)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub model_name: String,
    pub batch_size: usize,
    /// Output dimension of the hashing provider. Model providers ignore it.
    pub dimension: usize,
    pub cache_dir: Option<PathBuf>,
    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            dimension: DEFAULT_HASHING_DIMENSION,
            cache_dir: None,
            show_download_progress: false,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(EmbeddingError::Config(
                "embedding model name must not be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EmbeddingError::Config(
                "embedding batch size must be positive".to_string(),
            ));
        }
        if self.provider == ProviderKind::Hashing && self.dimension == 0 {
            return Err(EmbeddingError::Config(
                "hashing dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
