pub mod chunking;
pub mod index_store;
pub mod retrieval;

pub use chunking::{chunk_text, reconstruct};
pub use index_store::{IndexCache, IndexStore};
pub use retrieval::Retriever;
