//! Layered configuration: defaults, global file, project file, environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use analyst_embeddings::{EmbeddingConfig, ProviderKind};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

pub const DEFAULT_SOURCE_PATH: &str = "data/report.pdf";
pub const DEFAULT_INDEX_PATH: &str = "data/rag_index.bin";
pub const DEFAULT_METADATA_PATH: &str = "data/rag_meta.json";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_TOP_K: usize = 5;

const PROJECT_CONFIG_PATH: &str = ".analyst/config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub artifacts: ArtifactPaths,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub document_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from(DEFAULT_SOURCE_PATH),
        }
    }
}

/// Where the index and its metadata live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
        }
    }
}

impl ArtifactPaths {
    pub fn new(index_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            metadata_path: metadata_path.into(),
        }
    }

    /// Paths under `dir` using the default file names.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("rag_index.bin"), dir.join("rag_meta.json"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        let mut name = self
            .index_path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".manifest.json");
        self.index_path.with_file_name(name)
    }
}

/// Sliding-window parameters, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RetrievalError::Config(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(RetrievalError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    pub const fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Results farther than this squared L2 distance are dropped. `None`
    /// keeps every hit up to `top_k`.
    pub max_distance: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_distance: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_file(Path::new(PROJECT_CONFIG_PATH))?;
        let merged = Self::merge(global, project);
        let config = merged.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a single explicit config file, then applies the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RetrievalError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config = Self::load_file(path)?.unwrap_or_default();
        let config = config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<Self>> {
        let config_dir = directories::ProjectDirs::from("", "", "analyst").map_or_else(
            || PathBuf::from("~/.config/analyst"),
            |d| d.config_dir().to_path_buf(),
        );

        Self::load_file(&config_dir.join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml(&content).map_err(|e| {
                RetrievalError::Config(format!("{}: {e}", path.display()))
            })?;
            Ok(Some(config))
        } else {
            Ok(None)
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RetrievalError::Config(e.to_string()))
    }

    /// A project file replaces the global one wholesale.
    fn merge(global: Option<Self>, project: Option<Self>) -> Self {
        project.or(global).unwrap_or_default()
    }

    fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = var("SOURCE_DOCUMENT_PATH").or_else(|| var("RAG_PDF_PATH")) {
            self.source.document_path = PathBuf::from(path);
        }
        if let Some(path) = var("INDEX_PATH") {
            self.artifacts.index_path = PathBuf::from(path);
        }
        if let Some(path) = var("METADATA_PATH") {
            self.artifacts.metadata_path = PathBuf::from(path);
        }
        if let Some(value) = var("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_var("CHUNK_SIZE", &value)?;
        }
        if let Some(value) = var("CHUNK_OVERLAP") {
            self.chunking.overlap = parse_var("CHUNK_OVERLAP", &value)?;
        }
        if let Some(name) = var("EMBEDDING_MODEL_NAME") {
            self.embedding.model_name = name;
        }
        if let Some(value) = var("EMBEDDING_PROVIDER") {
            self.embedding.provider = value
                .parse::<ProviderKind>()
                .map_err(|e| RetrievalError::Config(e.to_string()))?;
        }
        if let Some(value) = var("TOP_K") {
            self.retrieval.top_k = parse_var("TOP_K", &value)?;
        }
        if let Some(value) = var("MAX_DISTANCE") {
            self.retrieval.max_distance = Some(parse_var("MAX_DISTANCE", &value)?);
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.embedding
            .validate()
            .map_err(|e| RetrievalError::Config(e.to_string()))?;
        if self.retrieval.top_k == 0 {
            return Err(RetrievalError::Config("top_k must be at least 1".to_string()));
        }
        if let Some(max) = self.retrieval.max_distance
            && !(max.is_finite() && max >= 0.0)
        {
            return Err(RetrievalError::Config(format!(
                "max_distance must be a non-negative number, got {max}"
            )));
        }
        if self.artifacts.index_path == self.artifacts.metadata_path {
            return Err(RetrievalError::Config(
                "index and metadata paths must differ".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RetrievalError::Config(format!("{key}={value}: {e}")))
}
