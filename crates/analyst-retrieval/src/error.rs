use std::path::PathBuf;

use analyst_embeddings::EmbeddingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Source document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("Unsupported document type: {}", .0.display())]
    UnsupportedDocument(PathBuf),

    #[error("Failed to extract text from {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error("Document produced no text to index: {}", .0.display())]
    EmptyDocument(PathBuf),

    #[error("Index artifact missing: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Index artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot build an index from zero embeddings")]
    EmptyIndex,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Index encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl RetrievalError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DocumentNotFound(_) | Self::ArtifactMissing(_) => 1,
            Self::UnsupportedDocument(_) | Self::Extraction { .. } | Self::EmptyDocument(_) => 2,
            Self::Config(_) | Self::InvalidArgument(_) => 3,
            Self::ArtifactCorrupt(_) | Self::DimensionMismatch { .. } | Self::EmptyIndex => 4,
            Self::Embedding(e) if e.is_configuration() => 3,
            Self::Embedding(_) => 5,
            Self::Io(_) | Self::Serialization(_) | Self::Encoding(_) => 10,
        }
    }

    /// Load failures that a rebuild from the source document can repair.
    pub const fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            Self::ArtifactMissing(_)
                | Self::ArtifactCorrupt(_)
                | Self::DimensionMismatch { .. }
                | Self::EmptyIndex
                | Self::Serialization(_)
                | Self::Encoding(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
