mod common;

use std::fs;
use std::sync::Arc;

use analyst_embeddings::{Embedder, HashingEmbedder};
use analyst_retrieval::{ArtifactPaths, ChunkingConfig, IndexStore, RetrievalError};
use common::{
    CountingEmbedder, DIMENSION, Fixture, SECTIONS, artifacts_exist, read_metadata, store_at,
};
use pretty_assertions::assert_eq;

#[test]
fn test_ensure_builds_and_persists_when_absent() {
    let fixture = Fixture::new();
    let embedder = CountingEmbedder::new(DIMENSION);
    let store = fixture.store(embedder.clone());

    let loaded = store.ensure(&fixture.source).unwrap();

    assert_eq!(loaded.len(), SECTIONS.len());
    assert_eq!(loaded.dimension(), DIMENSION);
    assert_eq!(embedder.calls(), 1);
    assert!(artifacts_exist(&fixture.paths));

    let metadata = read_metadata(&fixture.paths.metadata_path);
    assert_eq!(metadata.len(), SECTIONS.len());
    assert!(metadata[0].starts_with(SECTIONS[0]));
    assert!(metadata[3].ends_with('\n'));

    let manifest = loaded.manifest().unwrap();
    assert_eq!(manifest.rows, SECTIONS.len());
    assert_eq!(manifest.embedding_model, format!("hashing-{DIMENSION}"));
    assert_eq!(manifest.chunk_size, common::SECTION_CHARS);
    assert_eq!(manifest.chunk_overlap, 0);
}

#[test]
fn test_ensure_is_idempotent() {
    let fixture = Fixture::new();
    let embedder = CountingEmbedder::new(DIMENSION);
    let store = fixture.store(embedder.clone());

    let first = store.ensure(&fixture.source).unwrap();
    let second = store.ensure(&fixture.source).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(embedder.calls(), 1);
}

#[test]
fn test_fresh_store_loads_persisted_artifact_without_rebuilding() {
    let fixture = Fixture::new();
    let built = fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();

    let embedder = CountingEmbedder::new(DIMENSION);
    let loaded = fixture.store(embedder.clone()).ensure(&fixture.source).unwrap();

    assert_eq!(embedder.calls(), 0);
    assert_eq!(loaded.metadata(), built.metadata());
    assert_eq!(loaded.manifest(), built.manifest());

    let query = embedder.embed_one("net debt borrowings repaid").unwrap();
    assert_eq!(
        loaded.index().search(&query, 4).unwrap(),
        built.index().search(&query, 4).unwrap()
    );
}

#[test]
fn test_corrupt_metadata_is_rejected_and_rebuilt() {
    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();

    let truncated = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    fs::write(
        &fixture.paths.metadata_path,
        serde_json::to_string(&truncated).unwrap(),
    )
    .unwrap();

    let embedder = CountingEmbedder::new(DIMENSION);
    let store = fixture.store(embedder.clone());
    assert!(matches!(store.load(), Err(RetrievalError::ArtifactCorrupt(_))));

    let loaded = store.ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 1);
    assert_eq!(loaded.len(), SECTIONS.len());
    assert_eq!(read_metadata(&fixture.paths.metadata_path).len(), SECTIONS.len());
}

#[test]
fn test_garbage_index_file_is_rebuilt() {
    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();
    fs::write(&fixture.paths.index_path, b"not an index").unwrap();

    let embedder = CountingEmbedder::new(DIMENSION);
    let store = fixture.store(embedder.clone());
    assert!(store.load().unwrap_err().requires_rebuild());

    let loaded = store.ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 1);
    assert_eq!(loaded.len(), SECTIONS.len());
}

#[test]
fn test_empty_document_fails_build() {
    let fixture = Fixture::new();
    let empty = fixture.path("empty.txt");
    fs::write(&empty, "").unwrap();
    let whitespace = fixture.path("blank.txt");
    fs::write(&whitespace, "  \n\n \x0c \n").unwrap();

    let store = fixture.store(CountingEmbedder::new(DIMENSION));
    assert!(matches!(store.ensure(&empty), Err(RetrievalError::EmptyDocument(_))));
    assert!(matches!(store.build(&whitespace), Err(RetrievalError::EmptyDocument(_))));
    assert!(store.cached().is_none());
    assert!(!fixture.paths.index_path.exists());
}

#[test]
fn test_missing_source_without_artifact() {
    let fixture = Fixture::new();
    let store = fixture.store(CountingEmbedder::new(DIMENSION));

    let err = store.ensure(&fixture.path("absent.pdf")).unwrap_err();
    assert!(matches!(err, RetrievalError::DocumentNotFound(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_unsupported_source_type() {
    let fixture = Fixture::new();
    let sheet = fixture.path("report.xlsx");
    fs::write(&sheet, "binary").unwrap();

    let store = fixture.store(CountingEmbedder::new(DIMENSION));
    assert!(matches!(
        store.build(&sheet),
        Err(RetrievalError::UnsupportedDocument(_))
    ));
}

#[test]
fn test_missing_source_with_artifact_loads() {
    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();
    fs::remove_file(&fixture.source).unwrap();

    let embedder = CountingEmbedder::new(DIMENSION);
    let loaded = fixture.store(embedder.clone()).ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 0);
    assert_eq!(loaded.len(), SECTIONS.len());
}

#[test]
fn test_concurrent_first_use_builds_once() {
    let fixture = Fixture::new();
    let embedder = CountingEmbedder::new(DIMENSION);
    let store = fixture.store(embedder.clone());

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| store.ensure(&fixture.source).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(embedder.calls(), 1);
    for loaded in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], loaded));
    }
}

#[test]
fn test_persistence_failure_still_returns_index() {
    let fixture = Fixture::new();
    let blocker = fixture.path("not-a-dir");
    fs::write(&blocker, "file").unwrap();
    let paths = ArtifactPaths::in_dir(&blocker);

    let embedder = CountingEmbedder::new(DIMENSION);
    let store = store_at(&paths, embedder.clone());

    let loaded = store.ensure(&fixture.source).unwrap();
    assert_eq!(loaded.len(), SECTIONS.len());
    assert!(!paths.index_path.exists());
    assert!(store.persist(&loaded).is_err());

    // Served from the cache afterwards.
    store.ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 1);
}

#[test]
fn test_changed_source_triggers_rebuild() {
    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();

    let revised = common::report_text().replace("10 rupees", "12 rupees");
    fs::write(&fixture.source, revised).unwrap();

    let embedder = CountingEmbedder::new(DIMENSION);
    let loaded = fixture.store(embedder.clone()).ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 1);
    assert!(loaded.metadata()[0].contains("12 rupees"));
    assert!(read_metadata(&fixture.paths.metadata_path)[0].contains("12 rupees"));
}

#[test]
fn test_changed_model_triggers_rebuild() {
    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();

    let smaller: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(256).unwrap());
    let loaded = fixture.store(smaller).ensure(&fixture.source).unwrap();
    assert_eq!(loaded.dimension(), 256);
    assert_eq!(loaded.manifest().unwrap().embedding_model, "hashing-256");
}

#[test]
fn test_changed_chunking_triggers_rebuild() {
    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();

    let embedder = CountingEmbedder::new(DIMENSION);
    let store = IndexStore::new(
        fixture.paths.clone(),
        ChunkingConfig::new(50, 10).unwrap(),
        embedder.clone(),
    )
    .unwrap();

    let loaded = store.ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 1);
    // 400 chars, stride 40
    assert_eq!(loaded.len(), 10);
}

#[test]
fn test_stale_artifact_served_when_rebuild_impossible() {
    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();
    fs::remove_file(&fixture.source).unwrap();

    let store = IndexStore::new(
        fixture.paths.clone(),
        ChunkingConfig::new(50, 10).unwrap(),
        CountingEmbedder::new(DIMENSION),
    )
    .unwrap();

    let loaded = store.ensure(&fixture.source).unwrap();
    assert_eq!(loaded.len(), SECTIONS.len());
}

#[test]
fn test_artifact_without_manifest_is_trusted() {
    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();
    fs::remove_file(fixture.paths.manifest_path()).unwrap();

    let embedder = CountingEmbedder::new(DIMENSION);
    let loaded = fixture.store(embedder.clone()).ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 0);
    assert!(loaded.manifest().is_none());
}

#[test]
fn test_invalidate_reloads_from_disk() {
    let fixture = Fixture::new();
    let embedder = CountingEmbedder::new(DIMENSION);
    let store = fixture.store(embedder.clone());

    let first = store.ensure(&fixture.source).unwrap();
    assert!(store.invalidate());
    assert!(!store.invalidate());

    let second = store.ensure(&fixture.source).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(embedder.calls(), 1);
    assert_eq!(first.metadata(), second.metadata());
}

#[test]
fn test_rebuild_replaces_cache() {
    let fixture = Fixture::new();
    let embedder = CountingEmbedder::new(DIMENSION);
    let store = fixture.store(embedder.clone());

    let first = store.ensure(&fixture.source).unwrap();
    let rebuilt = store.rebuild(&fixture.source).unwrap();

    assert_eq!(embedder.calls(), 2);
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    assert!(Arc::ptr_eq(&rebuilt, &store.cached().unwrap()));
}

#[test]
fn test_status_and_clear_artifacts() {
    let fixture = Fixture::new();
    let store = fixture.store(CountingEmbedder::new(DIMENSION));

    let before = store.status().unwrap();
    assert!(!before.is_present());
    assert!(before.manifest.is_none());
    assert_eq!(before.cached_rows, None);

    store.ensure(&fixture.source).unwrap();
    let after = store.status().unwrap();
    assert!(after.is_present());
    assert_eq!(after.manifest.unwrap().rows, SECTIONS.len());
    assert_eq!(after.cached_rows, Some(SECTIONS.len()));

    assert_eq!(store.clear_artifacts().unwrap(), 3);
    assert!(store.cached().is_none());
    assert!(!fixture.paths.index_path.exists());
    assert!(!fixture.paths.metadata_path.exists());
    assert!(!fixture.paths.manifest_path().exists());
    assert_eq!(store.clear_artifacts().unwrap(), 0);
}

#[test]
fn test_metadata_swapped_with_same_row_count_is_rebuilt() {
    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();

    let mut metadata = read_metadata(&fixture.paths.metadata_path);
    metadata[0] = metadata[0].replace("10 rupees", "99 rupees");
    fs::write(
        &fixture.paths.metadata_path,
        serde_json::to_string_pretty(&metadata).unwrap(),
    )
    .unwrap();

    let embedder = CountingEmbedder::new(DIMENSION);
    let store = fixture.store(embedder.clone());
    assert!(matches!(store.load(), Err(RetrievalError::ArtifactCorrupt(_))));

    let loaded = store.ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 1);
    assert!(loaded.metadata()[0].contains("10 rupees"));
}

#[test]
fn test_interrupted_persist_is_not_served() {
    // Index from a revised report of the same length, written over the
    // original before the metadata rename happened.
    let revised = Fixture::new();
    fs::write(
        &revised.source,
        common::report_text().replace("10 rupees", "12 rupees"),
    )
    .unwrap();
    revised
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&revised.source)
        .unwrap();

    let fixture = Fixture::new();
    fixture
        .store(CountingEmbedder::new(DIMENSION))
        .ensure(&fixture.source)
        .unwrap();

    fs::remove_file(fixture.paths.manifest_path()).unwrap();
    fs::copy(&revised.paths.index_path, &fixture.paths.index_path).unwrap();
    let mut pending = fixture.paths.metadata_path.clone().into_os_string();
    pending.push(".tmp");
    fs::copy(&revised.paths.metadata_path, &pending).unwrap();

    let embedder = CountingEmbedder::new(DIMENSION);
    let store = fixture.store(embedder.clone());
    assert!(matches!(store.load(), Err(RetrievalError::ArtifactCorrupt(_))));

    let loaded = store.ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 1);
    assert!(loaded.metadata()[0].contains("10 rupees"));
    assert!(loaded.manifest().is_some());

    // A fresh store now trusts the rewritten artifact.
    let embedder = CountingEmbedder::new(DIMENSION);
    fixture.store(embedder.clone()).ensure(&fixture.source).unwrap();
    assert_eq!(embedder.calls(), 0);
}

#[test]
fn test_clear_artifacts_removes_leftover_temp_files() {
    let fixture = Fixture::new();
    let store = fixture.store(CountingEmbedder::new(DIMENSION));
    store.ensure(&fixture.source).unwrap();

    let mut pending = fixture.paths.index_path.clone().into_os_string();
    pending.push(".tmp");
    fs::write(&pending, b"partial").unwrap();

    assert_eq!(store.clear_artifacts().unwrap(), 3);
    assert!(!std::path::Path::new(&pending).exists());
}
