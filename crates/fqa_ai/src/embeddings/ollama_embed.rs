use fqa_core::error::{AppError, EMBEDDING_FAILED};
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::http::map_call_error;
use crate::ollama::OllamaClient;

/// Inputs longer than this are cut before being sent.
const MAX_INPUT_BYTES: usize = 12_000;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

fn bounded(input: &str) -> &str {
    if input.len() <= MAX_INPUT_BYTES {
        return input;
    }
    let mut end = MAX_INPUT_BYTES;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    &input[..end]
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let url = format!("{}/api/embeddings", self.client.base_url());
        let req = EmbeddingsRequest {
            model,
            prompt: bounded(input),
        };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new(EMBEDDING_FAILED, "Failed to encode embeddings request")
                .with_details(e.to_string())
        })?;

        let resp = ureq::post(&url)
            .timeout(self.client.timeout())
            .send_json(body)
            .map_err(|e| map_call_error(EMBEDDING_FAILED, "Failed to call embeddings endpoint", e))?;

        let v: EmbeddingsResponse = resp.into_json().map_err(|e| {
            AppError::new(EMBEDDING_FAILED, "Failed to decode embeddings response")
                .with_details(e.to_string())
        })?;
        if v.embedding.is_empty() {
            return Err(AppError::new(
                EMBEDDING_FAILED,
                "Embeddings response was empty",
            )
            .with_details(format!("model={model}")));
        }
        Ok(v.embedding)
    }
}
