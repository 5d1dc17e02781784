#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use fqa_ai::build::{build_index, IndexBuildInput, IndexBuildSummary};
use fqa_ai::embeddings::Embedder;
use fqa_ai::llm::{GenerateRequest, Llm};
use fqa_core::config::PipelineConfig;
use fqa_core::error::{AppError, EMBEDDING_FAILED, SYNTHESIS_FAILED};
use fqa_core::forms::{parse_corpus, FormText, DEFAULT_MAX_CHUNK_CHARS};

pub const MODEL: &str = "mock-minilm";

pub const VOCAB: &[&str] = &[
    "ppf", "withdrawal", "form", "requires", "kyc", "update", "aadhar", "pan", "needed", "account",
];

pub const CORPUS: &str = r#"[
  {"form_name": "ppf_withdrawal.pdf", "fields": [], "raw_text": "PPF withdrawal requires Form C"},
  {"form_name": "kyc_update.pdf", "fields": [], "raw_text": "KYC update needs Aadhar and PAN"}
]"#;

pub fn corpus() -> Vec<FormText> {
    parse_corpus(CORPUS).expect("corpus")
}

/// Deterministic bag-of-words embedding over `VOCAB`.
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn keyword_vector(input: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; VOCAB.len()];
    for token in input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
    {
        if let Some(i) = VOCAB.iter().position(|w| *w == token) {
            v[i] += 1.0;
        }
    }
    v
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(keyword_vector(input))
    }
}

/// Keyword embedder that can be switched off to simulate an outage.
pub struct FlakyEmbedder {
    pub online: AtomicBool,
}

impl FlakyEmbedder {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Embedder for FlakyEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(AppError::new(EMBEDDING_FAILED, "Failed to call embeddings endpoint")
                .with_details("connection refused")
                .with_retryable(true));
        }
        Ok(keyword_vector(input))
    }
}

/// Always answers with a vector of fixed length.
pub struct FixedDimsEmbedder(pub usize);

impl Embedder for FixedDimsEmbedder {
    fn embed(&self, _model: &str, _input: &str) -> Result<Vec<f32>, AppError> {
        Ok(vec![1.0; self.0])
    }
}

/// Answers from the prompt it was given and records every prompt.
pub struct FormAwareLlm {
    pub prompts: Mutex<Vec<String>>,
    pub temperatures: Mutex<Vec<f32>>,
}

impl FormAwareLlm {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl Llm for FormAwareLlm {
    fn generate(&self, req: &GenerateRequest<'_>) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(req.prompt.to_string());
        self.temperatures.lock().unwrap().push(req.temperature);
        if req.prompt.contains("Form C") {
            Ok("You need Form C to withdraw from your PPF account.".to_string())
        } else if req.prompt.contains("Aadhar") {
            Ok("Submit Aadhar and PAN for a KYC update.".to_string())
        } else {
            Ok("I don't know; no matching form was found.".to_string())
        }
    }
}

pub struct FailingLlm {
    pub retryable: bool,
}

impl Llm for FailingLlm {
    fn generate(&self, _req: &GenerateRequest<'_>) -> Result<String, AppError> {
        Err(AppError::new(SYNTHESIS_FAILED, "Failed to call the generative model")
            .with_details("status=429")
            .with_retryable(self.retryable))
    }
}

pub fn build_fixture_index(dir: &Path) -> IndexBuildSummary {
    build_index(
        &corpus(),
        dir,
        &KeywordEmbedder::new(),
        &IndexBuildInput {
            model: MODEL.to_string(),
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        },
    )
    .expect("build index")
}

pub fn config_for(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        openai_api_key: Some("sk-test-key".to_string()),
        index_dir: dir.to_path_buf(),
        embedding_model: MODEL.to_string(),
        ..PipelineConfig::default()
    }
}
