use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ChunkingConfig;
use crate::error::{Result, RetrievalError};
use crate::index::FlatIndex;

pub const MANIFEST_FORMAT_VERSION: u32 = 2;

/// Version stamp written next to the index and metadata files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub source_path: PathBuf,
    pub source_hash: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub rows: usize,
    /// blake3 of the index file bytes.
    pub index_digest: String,
    /// blake3 of the metadata file bytes.
    pub metadata_digest: String,
    pub built_at: DateTime<Utc>,
}

/// Hex blake3 digest of an artifact file's bytes.
pub fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

impl Manifest {
    /// Rejects index/metadata files that are not the pair this manifest was
    /// written with.
    pub fn verify(&self, index_bytes: &[u8], metadata_bytes: &[u8]) -> Result<()> {
        if digest(index_bytes) != self.index_digest {
            return Err(RetrievalError::ArtifactCorrupt(
                "index file does not match its manifest".to_string(),
            ));
        }
        if digest(metadata_bytes) != self.metadata_digest {
            return Err(RetrievalError::ArtifactCorrupt(
                "metadata file does not match its manifest".to_string(),
            ));
        }
        Ok(())
    }

    /// Why an artifact built under this manifest no longer matches the current
    /// settings, if it doesn't. `source_hash` is `None` when the source
    /// document could not be read; the hash check is skipped in that case.
    pub fn stale_reason(
        &self,
        embedding_model: &str,
        chunking: &ChunkingConfig,
        source_hash: Option<&str>,
    ) -> Option<String> {
        if self.format_version != MANIFEST_FORMAT_VERSION {
            return Some(format!(
                "manifest format {} (current {MANIFEST_FORMAT_VERSION})",
                self.format_version
            ));
        }
        if self.embedding_model != embedding_model {
            return Some(format!(
                "embedding model changed from '{}' to '{embedding_model}'",
                self.embedding_model
            ));
        }
        if self.chunk_size != chunking.chunk_size || self.chunk_overlap != chunking.overlap {
            return Some(format!(
                "chunking changed from {}/{} to {}/{}",
                self.chunk_size, self.chunk_overlap, chunking.chunk_size, chunking.overlap
            ));
        }
        if let Some(hash) = source_hash
            && hash != self.source_hash
        {
            return Some("source document content changed".to_string());
        }
        None
    }
}

/// An index paired with its positionally aligned chunk texts.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    index: FlatIndex,
    metadata: Vec<String>,
    manifest: Option<Manifest>,
}

impl LoadedIndex {
    /// Pairs an index with its metadata, rejecting any row-count disagreement.
    pub fn new(index: FlatIndex, metadata: Vec<String>, manifest: Option<Manifest>) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(RetrievalError::ArtifactCorrupt(format!(
                "index has {} rows but metadata has {} entries",
                index.len(),
                metadata.len()
            )));
        }
        if let Some(m) = &manifest
            && (m.rows != index.len() || m.dimension != index.dimension())
        {
            return Err(RetrievalError::ArtifactCorrupt(format!(
                "manifest records {} rows of dimension {}, files hold {} rows of dimension {}",
                m.rows,
                m.dimension,
                index.len(),
                index.dimension()
            )));
        }
        Ok(Self {
            index,
            metadata,
            manifest,
        })
    }

    pub const fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn metadata(&self) -> &[String] {
        &self.metadata
    }

    pub const fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn text(&self, row: usize) -> Option<&str> {
        self.metadata.get(row).map(String::as_str)
    }

    pub const fn len(&self) -> usize {
        self.index.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub const fn dimension(&self) -> usize {
        self.index.dimension()
    }
}

/// What exists on disk and in memory for one configured artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactStatus {
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
    pub manifest_path: PathBuf,
    pub index_exists: bool,
    pub metadata_exists: bool,
    pub manifest: Option<Manifest>,
    pub cached_rows: Option<usize>,
}

impl ArtifactStatus {
    pub const fn is_present(&self) -> bool {
        self.index_exists && self.metadata_exists
    }
}
