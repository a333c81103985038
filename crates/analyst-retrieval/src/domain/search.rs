use serde::{Deserialize, Serialize};

/// One nearest-neighbour hit: embedding row and squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Zero-based position in the ranked result list.
    pub rank: usize,
    pub row: usize,
    pub distance: f32,
    pub text: String,
}
