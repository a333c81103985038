pub mod artifact;
pub mod chunk;
pub mod document;
pub mod search;

pub use artifact::{ArtifactStatus, LoadedIndex, Manifest};
pub use chunk::Chunk;
pub use document::ExtractedText;
pub use search::{Neighbor, RetrievedChunk};
