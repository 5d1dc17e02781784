use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, INIT_FAILED};

pub const DEFAULT_INDEX_DIR: &str = "form_vector_db";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TOP_K: u32 = 3;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const MAX_TEMPERATURE: f32 = 2.0;

/// Accepted credential prefixes. `sk-proj-` keys are covered by `sk-`.
const CREDENTIAL_PREFIXES: &[&str] = &["sk-", "sk-proj-"];

/// Everything `initialize` needs. Fixed for the lifetime of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub index_dir: PathBuf,
    pub embedding_model: String,
    pub embedding_base_url: String,
    pub chat_model: String,
    pub openai_base_url: String,
    pub top_k: u32,
    pub temperature: f32,
    pub max_context_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            top_k: DEFAULT_TOP_K,
            temperature: DEFAULT_TEMPERATURE,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.top_k == 0 {
            return Err(AppError::new("CONFIG_INVALID", "top_k must be a positive integer"));
        }
        if !self.temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(
                AppError::new("CONFIG_INVALID", "temperature is out of range")
                    .with_details(format!("temperature={}; allowed=0.0..={MAX_TEMPERATURE}", self.temperature)),
            );
        }
        if self.max_context_chars == 0 {
            return Err(AppError::new("CONFIG_INVALID", "max_context_chars must be positive"));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::new("CONFIG_INVALID", "request_timeout_secs must be positive"));
        }
        if self.embedding_model.trim().is_empty() || self.chat_model.trim().is_empty() {
            return Err(AppError::new("CONFIG_INVALID", "model identifiers must not be empty"));
        }
        Ok(())
    }
}

/// Checks the generative-model credential before any network call uses it.
pub fn validate_credential(key: Option<&str>) -> Result<&str, AppError> {
    let key = key.map(str::trim).unwrap_or("");
    if key.is_empty() {
        return Err(AppError::new(
            INIT_FAILED,
            "OPENAI_API_KEY is missing",
        ));
    }
    if !CREDENTIAL_PREFIXES.iter().any(|p| key.starts_with(p)) {
        return Err(AppError::new(INIT_FAILED, "OPENAI_API_KEY is invalid")
            .with_details("expected a key starting with sk- or sk-proj-"));
    }
    Ok(key)
}
