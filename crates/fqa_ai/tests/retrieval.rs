mod support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use fqa_ai::index::{IndexEntry, VectorIndex};
use fqa_ai::pipeline::document_store_path;
use fqa_ai::retrieve::Retriever;
use fqa_core::docstore::DocumentStore;
use fqa_core::domain::Query;
use fqa_core::error::{DANGLING_REFERENCE, EMBEDDING_FAILED, RETRIEVAL_FAILED};

use support::{build_fixture_index, keyword_vector, FixedDimsEmbedder, KeywordEmbedder, MODEL, VOCAB};

fn fixture_retriever(dir: &std::path::Path, k: usize) -> Retriever {
    build_fixture_index(dir);
    let store = DocumentStore::load(&document_store_path(dir)).expect("store");
    let index = VectorIndex::load(dir, MODEL, VOCAB.len()).expect("index");
    Retriever::new(
        Arc::new(KeywordEmbedder::new()),
        Arc::new(index),
        Arc::new(store),
        MODEL,
        k,
    )
}

#[test]
fn ppf_question_retrieves_the_ppf_chunk_first() {
    let tmp = tempdir().unwrap();
    let retriever = fixture_retriever(tmp.path(), 1);

    let res = retriever
        .retrieve(&Query::new("What is needed for PPF withdrawal?"))
        .expect("retrieve");
    assert_eq!(res.hits.len(), 1);
    assert_eq!(res.hits[0].chunk.source_form, "ppf_withdrawal.pdf");
    assert_eq!(res.hits[0].chunk.text, "PPF withdrawal requires Form C");
    assert!(res.hits[0].score > 0.0);
}

#[test]
fn results_are_bounded_by_k_and_sorted_descending() {
    let tmp = tempdir().unwrap();
    let retriever = fixture_retriever(tmp.path(), 3);

    let res = retriever
        .retrieve(&Query::new("How do I update KYC with Aadhar?"))
        .expect("retrieve");
    // Only two chunks exist; k=3 returns all of them ranked.
    assert_eq!(res.hits.len(), 2);
    assert_eq!(res.hits[0].chunk.source_form, "kyc_update.pdf");
    assert!(res.hits[0].score >= res.hits[1].score);
    for id in res.chunk_ids() {
        assert!(!id.is_empty());
    }
}

#[test]
fn ties_keep_index_insertion_order() {
    let tmp = tempdir().unwrap();
    let retriever = fixture_retriever(tmp.path(), 2);

    // No vocabulary overlap with either chunk: every score is zero.
    let res = retriever
        .retrieve(&Query::new("account needed"))
        .expect("retrieve");
    let forms: Vec<&str> = res.hits.iter().map(|h| h.chunk.source_form.as_str()).collect();
    assert_eq!(forms, vec!["ppf_withdrawal.pdf", "kyc_update.pdf"]);
}

#[test]
fn empty_query_is_rejected() {
    let tmp = tempdir().unwrap();
    let retriever = fixture_retriever(tmp.path(), 3);
    let err = retriever.retrieve(&Query::new("   ")).unwrap_err();
    assert_eq!(err.code, RETRIEVAL_FAILED);
}

#[test]
fn unexpected_query_dimensionality_is_an_embedding_error() {
    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());
    let store = DocumentStore::load(&document_store_path(tmp.path())).expect("store");
    let index = VectorIndex::load(tmp.path(), MODEL, VOCAB.len()).expect("index");
    let retriever = Retriever::new(
        Arc::new(FixedDimsEmbedder(VOCAB.len() + 2)),
        Arc::new(index),
        Arc::new(store),
        MODEL,
        3,
    );
    let err = retriever.retrieve(&Query::new("PPF")).unwrap_err();
    assert_eq!(err.code, EMBEDDING_FAILED);
}

#[test]
fn index_entry_without_document_is_a_dangling_reference() {
    let index = VectorIndex::build(
        MODEL,
        vec![IndexEntry {
            chunk_id: "ghost".to_string(),
            embedding: keyword_vector("PPF withdrawal"),
        }],
    )
    .expect("index");
    let retriever = Retriever::new(
        Arc::new(KeywordEmbedder::new()),
        Arc::new(index),
        Arc::new(DocumentStore::default()),
        MODEL,
        3,
    );
    let err = retriever.retrieve(&Query::new("PPF withdrawal")).unwrap_err();
    assert_eq!(err.code, DANGLING_REFERENCE);
    assert!(err.is_fatal());
}
