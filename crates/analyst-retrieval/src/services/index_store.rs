//! Persistence and in-process caching of the index artifact.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use analyst_embeddings::{Embedder, Embedding, EmbeddingError};
use chrono::Utc;

use crate::config::{ArtifactPaths, ChunkingConfig};
use crate::domain::artifact::{MANIFEST_FORMAT_VERSION, digest};
use crate::domain::{ArtifactStatus, LoadedIndex, Manifest};
use crate::error::{Result, RetrievalError};
use crate::extract::{DocumentReader, hash_file};
use crate::index::FlatIndex;
use crate::services::chunking::chunk_text;

pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// Holds the loaded artifact for the lifetime of the owning store.
///
/// Callers get cheap `Arc` clones; the mutex only guards population and
/// replacement.
#[derive(Debug, Default)]
pub struct IndexCache {
    slot: Mutex<Option<Arc<LoadedIndex>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<LoadedIndex>>> {
        // The slot only ever holds a complete value, so a panic elsewhere
        // cannot leave it half-written.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> Option<Arc<LoadedIndex>> {
        self.lock().clone()
    }

    pub fn clear(&self) -> bool {
        self.lock().take().is_some()
    }
}

pub struct IndexStore {
    paths: ArtifactPaths,
    chunking: ChunkingConfig,
    reader: DocumentReader,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    cache: IndexCache,
}

impl IndexStore {
    pub fn new(
        paths: ArtifactPaths,
        chunking: ChunkingConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        chunking.validate()?;
        Ok(Self {
            paths,
            chunking,
            reader: DocumentReader::default(),
            embedder,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
            cache: IndexCache::new(),
        })
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub const fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub const fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// The embedder the index is built with; queries must use the same one.
    pub const fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn cached(&self) -> Option<Arc<LoadedIndex>> {
        self.cache.get()
    }

    /// Returns the cached artifact, loading it from disk or building it from
    /// `source` on first use.
    ///
    /// The cache lock is held across load and build, so concurrent first
    /// callers wait for one load/build and then share its result.
    pub fn ensure(&self, source: &Path) -> Result<Arc<LoadedIndex>> {
        let mut slot = self.cache.lock();
        if let Some(loaded) = slot.as_ref() {
            tracing::trace!("Index cache hit");
            return Ok(Arc::clone(loaded));
        }

        let loaded = Arc::new(self.load_or_build(source)?);
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Builds from `source` unconditionally and replaces the cached artifact.
    pub fn rebuild(&self, source: &Path) -> Result<Arc<LoadedIndex>> {
        let mut slot = self.cache.lock();
        let loaded = Arc::new(self.build(source)?);
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Drops the cached artifact so the next `ensure` goes back to disk.
    pub fn invalidate(&self) -> bool {
        let dropped = self.cache.clear();
        if dropped {
            tracing::info!("Index cache invalidated");
        }
        dropped
    }

    fn load_or_build(&self, source: &Path) -> Result<LoadedIndex> {
        let loaded = match self.load() {
            Ok(loaded) => loaded,
            Err(e) if e.requires_rebuild() => {
                tracing::warn!(error = %e, "Index artifact unusable, building from source");
                return self.build(source);
            }
            Err(e) => return Err(e),
        };

        let Some(reason) = self.stale_reason(&loaded, source) else {
            tracing::info!(rows = loaded.len(), dimension = loaded.dimension(), "Loaded index artifact");
            return Ok(loaded);
        };

        tracing::warn!(%reason, "Index artifact is stale, rebuilding");
        match self.build(source) {
            Ok(rebuilt) => Ok(rebuilt),
            Err(e) if loaded.dimension() == self.embedder.dimension() => {
                tracing::error!(error = %e, "Rebuild failed, serving the stale artifact");
                Ok(loaded)
            }
            Err(e) => Err(e),
        }
    }

    fn stale_reason(&self, loaded: &LoadedIndex, source: &Path) -> Option<String> {
        if loaded.dimension() != self.embedder.dimension() {
            return Some(format!(
                "index dimension {} does not match embedder dimension {}",
                loaded.dimension(),
                self.embedder.dimension()
            ));
        }

        let manifest = loaded.manifest()?;
        let source_hash = match hash_file(source) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::debug!(error = %e, "Source document unreadable, skipping content check");
                None
            }
        };
        manifest.stale_reason(
            self.embedder.model_name(),
            &self.chunking,
            source_hash.as_deref(),
        )
    }

    /// Reads the artifact from disk without consulting or filling the cache.
    pub fn load(&self) -> Result<LoadedIndex> {
        for path in [&self.paths.index_path, &self.paths.metadata_path] {
            if !path.is_file() {
                return Err(RetrievalError::ArtifactMissing(path.clone()));
            }
        }

        let manifest = self.read_manifest()?;
        if manifest.is_none() {
            self.check_no_interrupted_write()?;
        }

        let index_bytes = fs::read(&self.paths.index_path)?;
        let metadata_bytes = fs::read(&self.paths.metadata_path)?;
        if let Some(manifest) = &manifest {
            manifest.verify(&index_bytes, &metadata_bytes)?;
        }

        let index = FlatIndex::from_bytes(&index_bytes)?;
        let metadata: Vec<String> = serde_json::from_slice(&metadata_bytes)?;

        LoadedIndex::new(index, metadata, manifest)
    }

    /// Without a manifest the files carry no stamp tying them together, so a
    /// leftover temporary file means a persist stopped part way through and
    /// the pair on disk may be mixed.
    fn check_no_interrupted_write(&self) -> Result<()> {
        for path in [&self.paths.index_path, &self.paths.metadata_path] {
            let tmp = temp_path(path);
            if tmp.exists() {
                return Err(RetrievalError::ArtifactCorrupt(format!(
                    "interrupted write left {}",
                    tmp.display()
                )));
            }
        }
        Ok(())
    }

    fn read_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.paths.manifest_path();
        if !path.is_file() {
            return Ok(None);
        }
        let manifest = serde_json::from_reader(BufReader::new(File::open(&path)?))
            .map_err(|e| RetrievalError::ArtifactCorrupt(format!("{}: {e}", path.display())))?;
        Ok(Some(manifest))
    }

    /// Extracts, chunks, embeds and indexes `source`, then persists the
    /// result. A persistence failure is logged and the in-memory artifact is
    /// still returned.
    pub fn build(&self, source: &Path) -> Result<LoadedIndex> {
        let started = Instant::now();

        let source_hash = hash_file(source)?;
        let extracted = self.reader.read(source)?;
        if extracted.is_empty() {
            return Err(RetrievalError::EmptyDocument(source.to_path_buf()));
        }
        let chunks = chunk_text(&extracted.text, &self.chunking);
        tracing::info!(
            chunks = chunks.len(),
            chunk_size = self.chunking.chunk_size,
            overlap = self.chunking.overlap,
            "Chunked document"
        );

        let texts: Vec<String> = chunks.into_iter().map(|c| c.text).collect();
        let embeddings = self.embed_all(&texts)?;

        let index = FlatIndex::build(&embeddings)?;
        if index.dimension() != self.embedder.dimension() {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.embedder.dimension(),
                actual: index.dimension(),
            });
        }

        let encoded = EncodedArtifact::encode(&index, &texts)?;
        let manifest = Manifest {
            format_version: MANIFEST_FORMAT_VERSION,
            source_path: source.to_path_buf(),
            source_hash,
            embedding_model: self.embedder.model_name().to_string(),
            dimension: index.dimension(),
            chunk_size: self.chunking.chunk_size,
            chunk_overlap: self.chunking.overlap,
            rows: index.len(),
            index_digest: digest(&encoded.index),
            metadata_digest: digest(&encoded.metadata),
            built_at: Utc::now(),
        };
        let loaded = LoadedIndex::new(index, texts, Some(manifest))?;

        if let Err(e) = self.write_artifact(&encoded, loaded.manifest()) {
            tracing::error!(
                error = %e,
                index = %self.paths.index_path.display(),
                "Failed to persist index artifact, keeping in-memory index only"
            );
        }

        tracing::info!(
            rows = loaded.len(),
            dimension = loaded.dimension(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Built index"
        );
        Ok(loaded)
    }

    fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let total_batches = texts.len().div_ceil(self.batch_size);
        let mut embeddings = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            let batch_embeddings = self.embedder.embed(batch)?;
            if batch_embeddings.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: batch_embeddings.len(),
                }
                .into());
            }
            embeddings.extend(batch_embeddings);
            tracing::debug!(batch = i + 1, total = total_batches, "Embedded batch");
        }

        Ok(embeddings)
    }

    /// Writes index, metadata and manifest.
    ///
    /// Each file goes to a temporary sibling first and is renamed into place.
    /// The previous manifest is removed before anything else is replaced and
    /// the new one is written last.
    pub fn persist(&self, loaded: &LoadedIndex) -> Result<()> {
        let encoded = EncodedArtifact::encode(loaded.index(), loaded.metadata())?;
        self.write_artifact(&encoded, loaded.manifest())
    }

    fn write_artifact(&self, encoded: &EncodedArtifact, manifest: Option<&Manifest>) -> Result<()> {
        let manifest_path = self.paths.manifest_path();
        for path in [&self.paths.index_path, &self.paths.metadata_path] {
            ensure_parent(path)?;
        }
        remove_if_exists(&manifest_path)?;

        let index_tmp = write_temp(&self.paths.index_path, |w| {
            w.write_all(&encoded.index).map_err(Into::into)
        })?;
        let metadata_tmp = match write_temp(&self.paths.metadata_path, |w| {
            w.write_all(&encoded.metadata).map_err(Into::into)
        }) {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&index_tmp);
                return Err(e);
            }
        };

        fs::rename(&index_tmp, &self.paths.index_path)?;
        fs::rename(&metadata_tmp, &self.paths.metadata_path)?;

        if let Some(manifest) = manifest {
            let manifest_tmp = write_temp(&manifest_path, |w| {
                serde_json::to_writer_pretty(w, manifest).map_err(Into::into)
            })?;
            fs::rename(&manifest_tmp, &manifest_path)?;
        }

        tracing::debug!(
            index = %self.paths.index_path.display(),
            metadata = %self.paths.metadata_path.display(),
            "Persisted index artifact"
        );
        Ok(())
    }

    /// Deletes the artifact files and drops the cache. Returns how many files
    /// were removed.
    pub fn clear_artifacts(&self) -> Result<usize> {
        self.invalidate();
        let mut removed = 0;
        for path in [
            self.paths.index_path.clone(),
            self.paths.metadata_path.clone(),
            self.paths.manifest_path(),
        ] {
            remove_if_exists(&temp_path(&path))?;
            if remove_if_exists(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn status(&self) -> Result<ArtifactStatus> {
        Ok(ArtifactStatus {
            index_path: self.paths.index_path.clone(),
            metadata_path: self.paths.metadata_path.clone(),
            manifest_path: self.paths.manifest_path(),
            index_exists: self.paths.index_path.is_file(),
            metadata_exists: self.paths.metadata_path.is_file(),
            manifest: self.read_manifest()?,
            cached_rows: self.cache.get().map(|loaded| loaded.len()),
        })
    }
}

/// Serialized index and metadata, exactly as written to disk.
struct EncodedArtifact {
    index: Vec<u8>,
    metadata: Vec<u8>,
}

impl EncodedArtifact {
    fn encode(index: &FlatIndex, metadata: &[String]) -> Result<Self> {
        Ok(Self {
            index: index.to_bytes()?,
            metadata: serde_json::to_vec_pretty(metadata)?,
        })
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_temp<F>(path: &Path, write: F) -> Result<PathBuf>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = temp_path(path);
    match write_file(&tmp, write) {
        Ok(()) => Ok(tmp),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
