use ragdb_core::config::RagConfig;
use ragdb_core::error::Error;
use ragdb_core::types::{Document, SourceKind};
use ragdb_text::Bm25Index;

fn doc(id: &str, content: &str) -> Document {
    Document::new(id, content, format!("/tmp/{id}.txt"), 0)
}

#[test]
fn cat_mat_query_ranks_doc_a_first() {
    let mut index = Bm25Index::default();
    index.add(doc("doc_A", "the cat sat on the mat"));
    index.add(doc("doc_B", "the dog ran in the park"));

    let results = index.search("cat mat", 10).expect("search");
    assert_eq!(results.len(), 1, "doc_B shares no query term and scores zero");
    assert_eq!(results[0].document.id, "doc_A");
    assert_eq!(results[0].source, SourceKind::Text);
    assert!(results[0].value > 0.0);
}

#[test]
fn results_are_sorted_descending_and_truncated() {
    let mut index = Bm25Index::default();
    index.add(doc("one", "rust"));
    index.add(doc("two", "rust rust borrow checker lifetimes"));
    index.add(doc("three", "rust rust rust"));
    index.add(doc("four", "python"));

    let results = index.search("rust", 2).expect("search");
    assert_eq!(results.len(), 2);
    assert!(results[0].value >= results[1].value);
    let all = index.search("rust", 10).expect("search");
    assert_eq!(all.len(), 3);
    for pair in all.windows(2) { assert!(pair[0].value >= pair[1].value); }
}

#[test]
fn adding_a_document_increments_doc_frequency_by_one() {
    let mut index = Bm25Index::default();
    index.add(doc("a", "alpha beta"));
    index.add(doc("b", "beta gamma"));
    let before = index.doc_frequency("beta");

    index.add(doc("c", "beta beta beta delta"));
    assert_eq!(index.doc_frequency("beta"), before + 1);
    assert_eq!(index.doc_frequency("delta"), 1);
}

#[test]
fn unrelated_document_does_not_lower_scores() {
    let mut index = Bm25Index::default();
    index.add(doc("a", "cat food for a hungry cat"));
    index.add(doc("b", "dog leash"));
    let before = index.search("cat", 5).expect("search")[0].value;

    index.add(doc("c", "weather report for sunday afternoon"));
    let after = index.search("cat", 5).expect("search")[0].value;
    assert!(after >= before, "before={before} after={after}");
}

#[test]
fn empty_corpus_and_empty_query_yield_nothing() {
    let index = Bm25Index::default();
    assert!(index.search("anything", 3).expect("search").is_empty());

    let mut index = Bm25Index::default();
    index.add(doc("a", "some words here"));
    assert!(index.search("   ...  ", 3).expect("search").is_empty());
    assert!(index.search("absent", 3).expect("search").is_empty());
}

#[test]
fn zero_k_is_rejected() {
    let mut index = Bm25Index::default();
    index.add(doc("a", "content"));
    assert!(matches!(index.search("content", 0), Err(Error::InvalidArgument(_))));
}

#[test]
fn distance_view_is_lower_for_better_matches() {
    let mut index = Bm25Index::default();
    index.add(doc("a", "apple apple apple"));
    index.add(doc("b", "apple orange pear plum"));
    index.add(doc("c", "kiwi"));
    let results = index.search("apple", 5).expect("search");
    assert!(results[0].distance() < results[1].distance());
    assert!((results[0].distance() - (-0.1 * results[0].value).exp()).abs() < 1e-6);
}

#[test]
fn stop_word_setting_reaches_the_index() {
    let plain = RagConfig::default();
    let filtered = RagConfig { bm25_stop_words: true, ..RagConfig::default() };
    for (config, expect_match) in [(plain, true), (filtered, false)] {
        let mut index = Bm25Index::from_config(&config);
        index.add(doc("a", "the cat sat on the mat"));
        index.add(doc("b", "a dog in a park"));
        let hits = index.search("the", 5).expect("search");
        assert_eq!(!hits.is_empty(), expect_match);
        assert_eq!(index.search("cat", 5).expect("search").len(), 1);
    }
}

#[test]
fn snake_case_terms_match_whole() {
    let mut index = Bm25Index::default();
    index.add(doc("code", "call parse_ranking on the reply"));
    index.add(doc("prose", "parse the ranking"));
    let hits = index.search("parse_ranking", 5).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.id, "code");
}
