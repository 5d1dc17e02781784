use std::time::Duration;

use fqa_core::error::{AppError, SYNTHESIS_FAILED};
use serde::{Deserialize, Serialize};

use super::{GenerateRequest, Llm};
use crate::http::map_call_error;

pub const MAX_COMPLETION_TOKENS: u32 = 512;

const SYSTEM_PROMPT: &str =
    "You answer questions about government and banking forms using only the provided context.";

#[derive(Clone)]
pub struct OpenAiLlm {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiLlm")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiLlm {
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl Llm for OpenAiLlm {
    fn generate(&self, req: &GenerateRequest<'_>) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: req.model,
            temperature: req.temperature,
            max_tokens: MAX_COMPLETION_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: req.prompt,
                },
            ],
        };
        let body = serde_json::to_value(body).map_err(|e| {
            AppError::new(SYNTHESIS_FAILED, "Failed to encode completion request")
                .with_details(e.to_string())
        })?;

        let resp = ureq::post(&url)
            .timeout(self.timeout)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)
            .map_err(|e| map_call_error(SYNTHESIS_FAILED, "Failed to call the generative model", e))?;

        let parsed: ChatResponse = resp.into_json().map_err(|e| {
            AppError::new(SYNTHESIS_FAILED, "Failed to decode completion response")
                .with_details(e.to_string())
        })?;
        let text = parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AppError::new(SYNTHESIS_FAILED, "Completion response was empty"));
        }
        Ok(text.trim().to_string())
    }
}
