mod common;

use std::fs;
use std::sync::Arc;

use analyst_embeddings::{Embedder, HashingEmbedder, ProviderKind};
use analyst_retrieval::{Config, RetrievalConfig, RetrievalError, Retriever};
use common::{CountingEmbedder, DIMENSION, Fixture, SECTIONS};
use pretty_assertions::assert_eq;

fn config_for(fixture: &Fixture) -> Config {
    let mut config = Config::default();
    config.source.document_path.clone_from(&fixture.source);
    config.artifacts = fixture.paths.clone();
    config.chunking = common::section_chunking();
    config.embedding.provider = ProviderKind::Hashing;
    config.embedding.dimension = DIMENSION;
    config
}

fn retriever(fixture: &Fixture) -> Retriever {
    Retriever::from_config(&config_for(fixture)).unwrap()
}

#[test]
fn test_retrieve_ranks_matching_section_first() {
    let fixture = Fixture::new();
    let retriever = retriever(&fixture);

    let cases = [
        ("board recommended dividend per share", 0),
        ("net debt borrowings repaid", 1),
        ("grocery fashion store count", 2),
        ("Jio subscribers average revenue per user", 3),
    ];
    for (question, section) in cases {
        let excerpts = retriever.retrieve(question, Some(1)).unwrap();
        assert_eq!(excerpts.len(), 1, "{question}");
        assert!(excerpts[0].starts_with(SECTIONS[section]), "{question}");
    }
}

#[test]
fn test_retrieve_is_idempotent() {
    let fixture = Fixture::new();
    let retriever = retriever(&fixture);

    let first = retriever.retrieve_scored("net debt", Some(3)).unwrap();
    let second = retriever.retrieve_scored("net debt", Some(3)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_scored_results_are_ranked_by_distance() {
    let fixture = Fixture::new();
    let results = retriever(&fixture)
        .retrieve_scored("retail revenue grew", None)
        .unwrap();

    assert_eq!(results.len(), SECTIONS.len());
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.rank, i);
    }
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn test_top_k_larger_than_index_returns_every_row() {
    let fixture = Fixture::new();
    let two_sections = format!("{:<100}{:<99}", SECTIONS[0], SECTIONS[1]);
    fs::write(&fixture.source, two_sections).unwrap();

    let excerpts = retriever(&fixture).retrieve("dividend", Some(4)).unwrap();
    assert_eq!(excerpts.len(), 2);
}

#[test]
fn test_default_top_k_comes_from_config() {
    let fixture = Fixture::new();
    let mut config = config_for(&fixture);
    config.retrieval.top_k = 2;

    let excerpts = Retriever::from_config(&config)
        .unwrap()
        .retrieve("revenue", None)
        .unwrap();
    assert_eq!(excerpts.len(), 2);
}

#[test]
fn test_zero_top_k_is_rejected() {
    let fixture = Fixture::new();
    let retriever = retriever(&fixture);

    let err = retriever.retrieve("dividend", Some(0)).unwrap_err();
    assert!(matches!(err, RetrievalError::InvalidArgument(_)));
    // Rejected before any index work.
    assert!(!fixture.paths.index_path.exists());
}

#[test]
fn test_distance_cutoff_drops_weak_matches() {
    let fixture = Fixture::new();
    let mut config = config_for(&fixture);
    config.retrieval.max_distance = Some(1.2);

    let excerpts = Retriever::from_config(&config)
        .unwrap()
        .retrieve("board recommended dividend per share", Some(4))
        .unwrap();
    assert_eq!(excerpts.len(), 1);
    assert!(excerpts[0].starts_with(SECTIONS[0]));
}

#[test]
fn test_queries_share_one_build() {
    let fixture = Fixture::new();
    let embedder = CountingEmbedder::new(DIMENSION);
    let retriever = Retriever::with_embedder(&config_for(&fixture), embedder.clone()).unwrap();

    retriever.retrieve("dividend", None).unwrap();
    retriever.retrieve("debt", None).unwrap();
    retriever.retrieve("retail", None).unwrap();

    assert_eq!(embedder.calls(), 1);
    assert!(Arc::ptr_eq(
        &retriever.ensure_index().unwrap(),
        &retriever.store().cached().unwrap()
    ));
}

#[test]
fn test_missing_source_propagates_from_retrieve() {
    let fixture = Fixture::new();
    fs::remove_file(&fixture.source).unwrap();

    let err = retriever(&fixture).retrieve("dividend", None).unwrap_err();
    assert!(matches!(err, RetrievalError::DocumentNotFound(_)));
}

#[test]
fn test_retrieve_or_empty_degrades_to_no_context() {
    let fixture = Fixture::new();
    fs::remove_file(&fixture.source).unwrap();
    let retriever = retriever(&fixture);

    assert!(retriever.retrieve_or_empty("dividend", None).is_empty());
    assert!(retriever.retrieve_or_empty("dividend", Some(0)).is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let fixture = Fixture::new();
    let mut config = config_for(&fixture);
    config.retrieval.top_k = 0;

    assert!(matches!(
        Retriever::from_config(&config),
        Err(RetrievalError::Config(_))
    ));
}

#[test]
fn test_queries_use_the_index_embedder() {
    let fixture = Fixture::new();
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(256).unwrap());
    let store = fixture.store(Arc::clone(&embedder));
    let retriever = Retriever::new(store, &fixture.source, RetrievalConfig::default());

    assert!(Arc::ptr_eq(retriever.store().embedder(), &embedder));
    assert_eq!(retriever.embedding_model(), "hashing-256");

    let excerpts = retriever.retrieve("net debt borrowings repaid", Some(1)).unwrap();
    assert!(excerpts[0].starts_with(SECTIONS[1]));
}
