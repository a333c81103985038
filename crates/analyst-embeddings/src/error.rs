use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Failed to load embedding model {model}: {message}")]
    ModelLoad { model: String, message: String },

    #[error("Embedding inference failed: {0}")]
    Inference(String),

    #[error("Embedding backend returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Invalid embedding configuration: {0}")]
    Config(String),
}

impl EmbeddingError {
    /// Errors that no amount of retrying will fix without a config change.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownModel(_) | Self::ProviderUnavailable(_) | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;
