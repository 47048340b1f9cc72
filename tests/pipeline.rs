mod common;

use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{embedder, write_catalog, KeywordProvider};
use product_rag::core::errors::RagError;
use product_rag::index::{self, ArtifactPaths, BuildLock};
use product_rag::pipeline::IndexPipeline;
use product_rag::query::QueryEngine;

fn artifacts(dir: &Path) -> ArtifactPaths {
    ArtifactPaths::new(dir.join("product.index"), dir.join("product_metadata.json"))
}

#[tokio::test]
async fn build_then_query_returns_the_closest_product() {
    let tmp = tempfile::tempdir().unwrap();
    let content = tmp.path().join("scraped_results");
    write_catalog(&content);
    let provider = Arc::new(KeywordProvider::new());

    let pipeline = IndexPipeline::new(content, artifacts(tmp.path()), embedder(provider.clone(), 2));
    let report = pipeline.run().await.unwrap();

    assert_eq!(report.records_loaded, 3);
    assert_eq!(report.vectors_indexed, 3);
    assert_eq!(report.dimension, 6);
    assert_eq!(report.load.lines_skipped, 1);
    assert_eq!(report.load.records_excluded, 1);
    assert_eq!(report.embedding.batches_total, 2);
    assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 2);

    let engine = QueryEngine::load(&artifacts(tmp.path()), embedder(provider, 2)).unwrap();
    assert_eq!(engine.len(), 3);

    let hits = engine.search("a camera for travel", 3).await.unwrap();
    assert_eq!(hits[0].product.title, "Mirrorless Camera");
    assert_eq!(hits[0].product.category, "photo");
    assert_eq!(hits[0].product.rating.as_deref(), Some("4.2"));
    assert_eq!(hits[2].product.title, "Studio Headphones");
}

#[tokio::test]
async fn persisted_pair_stays_aligned_in_load_order() {
    let tmp = tempfile::tempdir().unwrap();
    let content = tmp.path().join("scraped_results");
    write_catalog(&content);

    let pipeline = IndexPipeline::new(
        content,
        artifacts(tmp.path()),
        embedder(Arc::new(KeywordProvider::new()), 100),
    );
    pipeline.run().await.unwrap();

    let loaded = index::load_artifacts(&artifacts(tmp.path())).unwrap();
    let titles: Vec<&str> = loaded.metadata.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Studio Headphones", "Mirrorless Camera", "Travel Tripod"]);
    for (position, meta) in loaded.metadata.iter().enumerate() {
        let expected = common::keyword_vector(&format!("{}\n\n{}", meta.title, match position {
            0 => "closed back headphones for mixing",
            1 => "compact camera with camera strap",
            _ => "carbon tripod that fits a camera",
        }));
        assert_eq!(loaded.index.vector(position), Some(expected.as_slice()));
    }
}

#[tokio::test]
async fn rebuilding_unchanged_input_yields_identical_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let content = tmp.path().join("scraped_results");
    write_catalog(&content);
    let pipeline = IndexPipeline::new(
        content,
        artifacts(tmp.path()),
        embedder(Arc::new(KeywordProvider::new()), 2),
    );

    pipeline.run().await.unwrap();
    let first_index = fs::read(tmp.path().join("product.index")).unwrap();
    let first_meta = fs::read(tmp.path().join("product_metadata.json")).unwrap();

    pipeline.run().await.unwrap();
    assert_eq!(fs::read(tmp.path().join("product.index")).unwrap(), first_index);
    assert_eq!(fs::read(tmp.path().join("product_metadata.json")).unwrap(), first_meta);
}

#[tokio::test]
async fn empty_catalog_refuses_to_write_an_index() {
    let tmp = tempfile::tempdir().unwrap();
    let content = tmp.path().join("scraped_results");
    fs::create_dir_all(content.join("audio")).unwrap();
    fs::write(content.join("audio").join("empty.jsonl"), "\n\n").unwrap();

    let pipeline = IndexPipeline::new(
        content,
        artifacts(tmp.path()),
        embedder(Arc::new(KeywordProvider::new()), 2),
    );

    assert!(matches!(pipeline.run().await, Err(RagError::NoVectors)));
    assert!(!tmp.path().join("product.index").exists());
    assert!(!tmp.path().join("product_metadata.json").exists());
}

#[tokio::test]
async fn missing_content_directory_is_a_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    let pipeline = IndexPipeline::new(
        tmp.path().join("nope"),
        artifacts(tmp.path()),
        embedder(Arc::new(KeywordProvider::new()), 2),
    );

    assert!(matches!(pipeline.run().await, Err(RagError::Config(_))));
}

#[tokio::test]
async fn build_is_refused_while_another_holds_the_lock() {
    let tmp = tempfile::tempdir().unwrap();
    let content = tmp.path().join("scraped_results");
    write_catalog(&content);
    let paths = artifacts(tmp.path());
    let _held = BuildLock::acquire(&paths).unwrap();

    let pipeline = IndexPipeline::new(content, paths, embedder(Arc::new(KeywordProvider::new()), 2));

    assert!(matches!(pipeline.run().await, Err(RagError::Config(_))));
    assert!(!tmp.path().join("product.index").exists());
}

#[tokio::test]
async fn single_record_build_keeps_its_own_vector() {
    let tmp = tempfile::tempdir().unwrap();
    let content = tmp.path().join("scraped_results");
    fs::create_dir_all(content.join("computers")).unwrap();
    fs::write(
        content.join("computers").join("one.jsonl"),
        common::product_line("Ultralight Laptop", "a laptop with a usb charger"),
    )
    .unwrap();
    let provider = Arc::new(KeywordProvider::new());

    IndexPipeline::new(content, artifacts(tmp.path()), embedder(provider.clone(), 4))
        .run()
        .await
        .unwrap();

    let loaded = index::load_artifacts(&artifacts(tmp.path())).unwrap();
    assert_eq!(loaded.index.count(), 1);
    assert_eq!(loaded.metadata[0].title, "Ultralight Laptop");
    assert_eq!(loaded.metadata[0].category, "computers");
    let reembedded = common::keyword_vector("Ultralight Laptop\n\na laptop with a usb charger");
    assert_eq!(loaded.index.vector(0), Some(reembedded.as_slice()));
}
