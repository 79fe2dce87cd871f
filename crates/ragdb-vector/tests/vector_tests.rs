use std::sync::Arc;

use ragdb_core::error::Error;
use ragdb_core::types::{Document, SourceKind};
use ragdb_embed::HashEmbedder;
use ragdb_vector::distance::{cosine_distance, euclidean_distance};
use ragdb_vector::{DistanceMetric, VectorIndex, VectorQuery};

fn doc(id: &str) -> Document {
    Document::new(id, format!("content of {id}"), "/tmp/src.txt", 0)
}

fn three_d_index(metric: DistanceMetric) -> VectorIndex {
    let mut index = VectorIndex::new(metric);
    index.add_vector(doc("first"), vec![1.0, 0.0, 0.0]).unwrap();
    index.add_vector(doc("second"), vec![0.0, 1.0, 0.0]).unwrap();
    index.add_vector(doc("third"), vec![0.9, 0.1, 0.0]).unwrap();
    index
}

#[test]
fn cosine_query_returns_first_then_third() {
    let index = three_d_index(DistanceMetric::Cosine);
    let results = index.search_vector(&[1.0, 0.0, 0.0], 2).expect("search");
    let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "third"]);
    assert!(results[0].value.abs() < 1e-6);
    assert_eq!(results[0].source, SourceKind::Vector);
}

#[test]
fn results_are_sorted_and_sized_min_k_len() {
    for metric in [DistanceMetric::Cosine, DistanceMetric::Euclidean] {
        let index = three_d_index(metric);
        for k in 1..=5 {
            let results = index.search_vector(&[0.3, 0.7, 0.2], k).expect("search");
            assert_eq!(results.len(), k.min(index.len()));
            for pair in results.windows(2) { assert!(pair[0].value <= pair[1].value); }
        }
    }
}

#[test]
fn ties_keep_insertion_order() {
    let mut index = VectorIndex::new(DistanceMetric::Euclidean);
    index.add_vector(doc("a"), vec![1.0, 0.0]).unwrap();
    index.add_vector(doc("b"), vec![-1.0, 0.0]).unwrap();
    index.add_vector(doc("c"), vec![0.0, 1.0]).unwrap();
    let results = index.search_vector(&[0.0, 0.0], 3).expect("search");
    let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn dimension_is_fixed_by_first_insert() {
    let mut index = VectorIndex::new(DistanceMetric::Cosine);
    index.add_vector(doc("a"), vec![1.0, 2.0]).unwrap();
    let err = index.add_vector(doc("b"), vec![1.0, 2.0, 3.0]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
    assert_eq!(index.len(), 1);
    assert_eq!(index.dimension(), Some(2));
}

#[test]
fn search_validates_k_and_dimension() {
    let index = three_d_index(DistanceMetric::Cosine);
    assert!(matches!(index.search_vector(&[1.0, 0.0, 0.0], 0), Err(Error::InvalidArgument(_))));
    assert!(matches!(index.search_vector(&[1.0, 0.0], 1), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn empty_index_returns_nothing() {
    let index = VectorIndex::new(DistanceMetric::Cosine);
    assert!(index.search_vector(&[1.0, 2.0], 3).expect("search").is_empty());
}

#[test]
fn cosine_identity_and_symmetry() {
    let a = [0.3f32, -1.2, 4.5, 0.01];
    let b = [2.0f32, 0.5, -0.7, 3.3];
    assert!(cosine_distance(&a, &a).abs() < 1e-6);
    assert_eq!(cosine_distance(&a, &b), cosine_distance(&b, &a));
    assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
}

#[tokio::test]
async fn text_queries_go_through_the_embedder() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let mut index = VectorIndex::with_embedder(DistanceMetric::Cosine, embedder);
    index.add_document(Document::new("cats", "cats purr and nap", "/tmp/a.txt", 0)).await.unwrap();
    index.add_document(Document::new("cars", "engines roar on highways", "/tmp/b.txt", 0)).await.unwrap();

    let results = index.search(VectorQuery::Text("cats purr"), 1).await.expect("search");
    assert_eq!(results[0].document.id, "cats");
}

#[tokio::test]
async fn text_input_without_embedder_is_rejected() {
    let mut index = VectorIndex::new(DistanceMetric::Cosine);
    let err = index.add_document(doc("a")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn nan_embedding_does_not_disturb_ordering() {
    for metric in [DistanceMetric::Cosine, DistanceMetric::Euclidean] {
        let mut index = three_d_index(metric);
        index.add_vector(doc("broken"), vec![f32::NAN, 0.0, 0.0]).unwrap();
        let results = index.search_vector(&[1.0, 0.0, 0.0], 4).expect("search");
        assert_eq!(results.len(), 4);
        let real: Vec<&str> =
            results.iter().filter(|r| !r.value.is_nan()).map(|r| r.document.id.as_str()).collect();
        assert_eq!(real, vec!["first", "third", "second"]);
        assert_ne!(results[0].document.id, "broken");
    }
}
