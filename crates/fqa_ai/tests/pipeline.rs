mod support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use fqa_ai::adapters::{deliver, Speaker, Translator};
use fqa_ai::index::VectorIndex;
use fqa_ai::pipeline::{answer, document_store_path, initialize, initialize_with};
use fqa_core::docstore::DocumentStoreWriter;
use fqa_core::domain::Chunk;
use fqa_core::error::{
    AppError, DANGLING_REFERENCE, EMBEDDING_FAILED, INDEX_LOAD_FAILED, INIT_FAILED,
    PIPELINE_QUERY_FAILED, SYNTHESIS_FAILED,
};

use support::{
    build_fixture_index, config_for, FailingLlm, FixedDimsEmbedder, FlakyEmbedder, FormAwareLlm,
    KeywordEmbedder,
};

#[test]
fn answers_ppf_question_with_supporting_chunk() {
    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());
    let mut cfg = config_for(tmp.path());
    cfg.top_k = 1;

    let handle = initialize_with(&cfg, Arc::new(KeywordEmbedder::new()), Arc::new(FormAwareLlm::new()))
        .expect("initialize");
    assert_eq!(handle.chunk_count(), 2);

    let rec = answer(&handle, "What is needed for PPF withdrawal?", Some("HI")).expect("answer");
    assert!(rec.answer_text.contains("Form C"));
    assert_eq!(rec.supporting_chunks.len(), 1);
    assert_eq!(rec.supporting_chunks[0].text, "PPF withdrawal requires Form C");
    assert_eq!(rec.query.text, "What is needed for PPF withdrawal?");
    assert_eq!(rec.query.language_hint.as_deref(), Some("hi"));
}

#[test]
fn missing_credential_fails_initialization() {
    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());
    let mut cfg = config_for(tmp.path());
    cfg.openai_api_key = None;

    let err = initialize_with(&cfg, Arc::new(KeywordEmbedder::new()), Arc::new(FormAwareLlm::new()))
        .unwrap_err();
    assert_eq!(err.code, INIT_FAILED);
    assert!(err.is_fatal());

    // The production entry point rejects it before touching the network.
    let err = initialize(&cfg).unwrap_err();
    assert_eq!(err.code, INIT_FAILED);

    cfg.openai_api_key = Some("not-a-key".to_string());
    assert_eq!(initialize(&cfg).unwrap_err().code, INIT_FAILED);
}

#[test]
fn missing_index_fails_initialization() {
    let tmp = tempdir().unwrap();
    let cfg = config_for(&tmp.path().join("nope"));
    let err = initialize_with(&cfg, Arc::new(KeywordEmbedder::new()), Arc::new(FormAwareLlm::new()))
        .unwrap_err();
    assert_eq!(err.code, INIT_FAILED);

    // Directory exists but nothing was built into it.
    let cfg = config_for(tmp.path());
    let err = initialize_with(&cfg, Arc::new(KeywordEmbedder::new()), Arc::new(FormAwareLlm::new()))
        .unwrap_err();
    assert_eq!(err.code, INIT_FAILED);
}

#[test]
fn dimensionality_mismatch_fails_initialization() {
    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());
    let cfg = config_for(tmp.path());

    let err = initialize_with(&cfg, Arc::new(FixedDimsEmbedder(384)), Arc::new(FormAwareLlm::new()))
        .unwrap_err();
    assert_eq!(err.code, INIT_FAILED);
    assert!(err.has_code(INDEX_LOAD_FAILED));
}

#[test]
fn unreachable_embedding_service_at_startup_fails_fast() {
    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());
    let embedder = Arc::new(FlakyEmbedder::new());
    embedder.set_online(false);

    let err = initialize_with(&config_for(tmp.path()), embedder, Arc::new(FormAwareLlm::new()))
        .unwrap_err();
    assert_eq!(err.code, INIT_FAILED);
    assert!(err.has_code(EMBEDDING_FAILED));
}

#[test]
fn desynchronized_store_fails_initialization() {
    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());

    // Drop one chunk from the store behind the index's back.
    assert!(keep_only_first_chunk(tmp.path()));

    let err = initialize_with(
        &config_for(tmp.path()),
        Arc::new(KeywordEmbedder::new()),
        Arc::new(FormAwareLlm::new()),
    )
    .unwrap_err();
    assert_eq!(err.code, INIT_FAILED);
    assert!(err.has_code(DANGLING_REFERENCE));
}

/// Rewrites the document store with only its first chunk; true when the index still lists two.
fn keep_only_first_chunk(dir: &std::path::Path) -> bool {
    let path = document_store_path(dir);
    let store = fqa_core::docstore::DocumentStore::load(&path).expect("store");
    let keep: Vec<Chunk> = store.chunks().iter().take(1).cloned().collect();
    let mut writer = DocumentStoreWriter::create(&path).expect("writer");
    writer.clear().expect("clear");
    writer.insert_chunks(&keep).expect("insert");
    VectorIndex::read_manifest(dir).expect("manifest").entry_count == 2
}

#[test]
fn embedding_outage_is_per_query_and_recovers_without_reinit() {
    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());
    let embedder = Arc::new(FlakyEmbedder::new());
    let handle = initialize_with(&config_for(tmp.path()), embedder.clone(), Arc::new(FormAwareLlm::new()))
        .expect("initialize");

    embedder.set_online(false);
    let err = answer(&handle, "What is needed for PPF withdrawal?", None).unwrap_err();
    assert_eq!(err.code, PIPELINE_QUERY_FAILED);
    assert_eq!(err.cause.as_ref().unwrap().code, EMBEDDING_FAILED);
    assert!(err.retryable);
    assert!(!err.is_fatal());

    embedder.set_online(true);
    let rec = answer(&handle, "What is needed for PPF withdrawal?", None).expect("answer");
    assert!(rec.answer_text.contains("Form C"));
}

#[test]
fn synthesis_failure_is_wrapped_and_recoverable() {
    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());
    let handle = initialize_with(
        &config_for(tmp.path()),
        Arc::new(KeywordEmbedder::new()),
        Arc::new(FailingLlm { retryable: true }),
    )
    .expect("initialize");

    let err = answer(&handle, "PPF withdrawal", None).unwrap_err();
    assert_eq!(err.code, PIPELINE_QUERY_FAILED);
    assert!(err.has_code(SYNTHESIS_FAILED));
    assert!(!err.is_fatal());
}

#[test]
fn handle_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<fqa_ai::pipeline::PipelineHandle>();

    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());
    let mut cfg = config_for(tmp.path());
    cfg.top_k = 1;
    let handle = initialize_with(&cfg, Arc::new(KeywordEmbedder::new()), Arc::new(FormAwareLlm::new()))
        .expect("initialize");

    std::thread::scope(|s| {
        let a = s.spawn(|| answer(&handle, "PPF withdrawal", None));
        let b = s.spawn(|| answer(&handle, "KYC update Aadhar", None));
        assert!(a.join().unwrap().unwrap().answer_text.contains("Form C"));
        assert!(b.join().unwrap().unwrap().answer_text.contains("Aadhar"));
    });
}

struct BrokenTranslator;

impl Translator for BrokenTranslator {
    fn translate(&self, _text: &str, target_lang: &str) -> Result<String, AppError> {
        Err(AppError::new("TRANSLATION_FAILED", "unsupported language")
            .with_details(format!("lang={target_lang}")))
    }
}

struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&self, _text: &str, _lang: &str) -> Result<(), AppError> {
        Err(AppError::new("SPEECH_FAILED", "no audio device"))
    }
}

#[test]
fn translation_failure_falls_back_to_original_answer() {
    let tmp = tempdir().unwrap();
    build_fixture_index(tmp.path());
    let handle = initialize_with(
        &config_for(tmp.path()),
        Arc::new(KeywordEmbedder::new()),
        Arc::new(FormAwareLlm::new()),
    )
    .expect("initialize");

    let rec = answer(&handle, "What is needed for PPF withdrawal?", Some("xx")).expect("answer");
    let out = deliver(&rec.answer_text, Some("xx"), Some(&BrokenTranslator), Some(&SilentSpeaker));
    assert_eq!(out.text, rec.answer_text);
    assert!(!out.translated);
    assert!(!out.spoken);
    assert_eq!(out.lang, "en");
}
