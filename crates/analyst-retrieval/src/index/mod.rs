//! Exact nearest-neighbour search over chunk embeddings.

mod flat;

pub use flat::FlatIndex;
