pub mod extract;

pub use analyst_embeddings::Embedder;
pub use extract::TextExtractor;
