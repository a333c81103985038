use std::cmp::Ordering;
use std::io::{Read, Write};

use analyst_embeddings::Embedding;
use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::domain::Neighbor;
use crate::error::{Result, RetrievalError};

const INDEX_MAGIC: [u8; 4] = *b"AFLT";
const INDEX_FORMAT_VERSION: u32 = 1;

/// Brute-force index over raw embeddings, ranked by squared Euclidean
/// distance.
///
/// Vectors are stored row-major and never normalised; callers wanting cosine
/// ranking must normalise before building.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

#[derive(Serialize)]
struct EncodedIndexRef<'a> {
    magic: [u8; 4],
    version: u32,
    dimension: u64,
    rows: u64,
    data: &'a [f32],
}

#[derive(Deserialize)]
struct EncodedIndex {
    magic: [u8; 4],
    version: u32,
    dimension: u64,
    rows: u64,
    data: Vec<f32>,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

impl FlatIndex {
    pub fn build(embeddings: &[Embedding]) -> Result<Self> {
        let Some(first) = embeddings.first() else {
            return Err(RetrievalError::EmptyIndex);
        };
        let dimension = first.len();
        if dimension == 0 {
            return Err(RetrievalError::InvalidArgument(
                "embeddings must have at least one component".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(dimension * embeddings.len());
        for embedding in embeddings {
            if embedding.len() != dimension {
                return Err(RetrievalError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            data.extend_from_slice(embedding);
        }

        Ok(Self {
            dimension,
            rows: embeddings.len(),
            data,
        })
    }

    pub const fn len(&self) -> usize {
        self.rows
    }

    pub const fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dimension).nth(row)
    }

    /// Returns up to `top_k` rows closest to `query`, closest first.
    ///
    /// Equal distances rank the lower row first, so results are stable across
    /// a serialize/deserialize round trip.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>> {
        if top_k == 0 {
            return Err(RetrievalError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| Neighbor {
                row,
                distance: squared_l2(query, vector),
            })
            .collect();

        let k = top_k.min(neighbors.len());
        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, rank_order);
            neighbors.truncate(k);
        }
        neighbors.sort_by(rank_order);

        Ok(neighbors)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let encoded = EncodedIndexRef {
            magic: INDEX_MAGIC,
            version: INDEX_FORMAT_VERSION,
            dimension: self.dimension as u64,
            rows: self.rows as u64,
            data: &self.data,
        };
        codec().serialize_into(writer, &encoded)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(24 + self.data.len() * 4);
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let encoded: EncodedIndex = codec()
            .with_limit(bytes.len() as u64)
            .deserialize(bytes)?;

        if encoded.magic != INDEX_MAGIC {
            return Err(RetrievalError::ArtifactCorrupt(
                "index file has an unrecognised header".to_string(),
            ));
        }
        if encoded.version != INDEX_FORMAT_VERSION {
            return Err(RetrievalError::ArtifactCorrupt(format!(
                "index format version {} is not supported",
                encoded.version
            )));
        }

        let corrupt = |what: &str| RetrievalError::ArtifactCorrupt(what.to_string());
        let dimension =
            usize::try_from(encoded.dimension).map_err(|_| corrupt("dimension out of range"))?;
        let rows = usize::try_from(encoded.rows).map_err(|_| corrupt("row count out of range"))?;

        if dimension == 0 || rows == 0 {
            return Err(corrupt("index holds no vectors"));
        }
        if dimension.checked_mul(rows) != Some(encoded.data.len()) {
            return Err(RetrievalError::ArtifactCorrupt(format!(
                "index declares {rows} rows of dimension {dimension} but stores {} values",
                encoded.data.len()
            )));
        }

        Ok(Self {
            dimension,
            rows,
            data: encoded.data,
        })
    }
}

fn rank_order(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.row.cmp(&b.row))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
