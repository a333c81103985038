#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use analyst_embeddings::{Embedder, Embedding, HashingEmbedder};
use analyst_retrieval::{ArtifactPaths, ChunkingConfig, IndexStore};

pub const DIMENSION: usize = 1024;
pub const SECTION_CHARS: usize = 100;

pub const SECTIONS: [&str; 4] = [
    "Dividend: the board recommended a dividend of 10 rupees per share for shareholders.",
    "Debt: net debt fell as borrowings were repaid from operating cash flow.",
    "Retail: store count expanded and retail revenue grew in grocery and fashion.",
    "Telecom: Jio subscribers increased and average revenue per user improved.",
];

/// Counts batch `embed` calls so tests can tell a build from a load.
pub struct CountingEmbedder {
    inner: HashingEmbedder,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new(dimension: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: HashingEmbedder::new(dimension).unwrap(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for CountingEmbedder {
    fn embed(&self, texts: &[String]) -> analyst_embeddings::Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(texts)
    }

    fn embed_one(&self, text: &str) -> analyst_embeddings::Result<Embedding> {
        self.inner.embed_one(text)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Each section padded to exactly `SECTION_CHARS`. The last one is one char
/// short because extraction appends a newline to the page.
pub fn report_text() -> String {
    let mut text = String::new();
    for (i, section) in SECTIONS.iter().enumerate() {
        let width = if i + 1 == SECTIONS.len() {
            SECTION_CHARS - 1
        } else {
            SECTION_CHARS
        };
        text.push_str(&format!("{section:<width$}"));
    }
    text
}

pub fn section_chunking() -> ChunkingConfig {
    ChunkingConfig::new(SECTION_CHARS, 0).unwrap()
}

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub source: PathBuf,
    pub paths: ArtifactPaths,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.txt");
        fs::write(&source, report_text()).unwrap();
        let paths = ArtifactPaths::in_dir(&dir.path().join("artifacts"));
        Self { dir, source, paths }
    }

    pub fn store(&self, embedder: Arc<dyn Embedder>) -> IndexStore {
        store_at(&self.paths, embedder)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn store_at(paths: &ArtifactPaths, embedder: Arc<dyn Embedder>) -> IndexStore {
    IndexStore::new(paths.clone(), section_chunking(), embedder).unwrap()
}

pub fn artifacts_exist(paths: &ArtifactPaths) -> bool {
    paths.index_path.is_file() && paths.metadata_path.is_file() && paths.manifest_path().is_file()
}

pub fn read_metadata(path: &Path) -> Vec<String> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
