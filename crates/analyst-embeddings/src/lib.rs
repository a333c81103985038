//! # analyst-embeddings
//!
//! Embedding providers for the analyst retrieval core.
//!
//! Every provider implements [`Embedder`]. Use [`create_embedder`] to build the
//! provider selected by an [`EmbeddingConfig`]:
//!
//! ```
//! use analyst_embeddings::{EmbeddingConfig, ProviderKind, create_embedder};
//!
//! # fn main() -> analyst_embeddings::Result<()> {
//! let config = EmbeddingConfig {
//!     provider: ProviderKind::Hashing,
//!     ..EmbeddingConfig::default()
//! };
//! let embedder = create_embedder(&config)?;
//! let vector = embedder.embed_one("consolidated net profit")?;
//! assert_eq!(vector.len(), embedder.dimension());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
#[cfg(feature = "fastembed")]
pub mod fastembed;
pub mod hashing;
pub mod provider;

pub use config::{EmbeddingConfig, ProviderKind};
pub use error::{EmbeddingError, Result};
#[cfg(feature = "fastembed")]
pub use self::fastembed::FastEmbedder;
pub use hashing::HashingEmbedder;
pub use provider::{Embedder, Embedding, create_embedder};
