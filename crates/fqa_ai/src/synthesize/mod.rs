use std::sync::Arc;

use fqa_core::domain::{AnswerRecord, Chunk, Query};
use fqa_core::error::{AppError, SYNTHESIS_FAILED};

use crate::llm::{GenerateRequest, Llm};

pub mod prompts;

/// Builds the prompt from ranked context and asks the generative model for an answer.
#[derive(Clone)]
pub struct Synthesizer {
    llm: Arc<dyn Llm>,
    model: String,
    temperature: f32,
    max_context_chars: usize,
}

/// Context chunks that fit the prompt budget.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedContext {
    pub chunks: Vec<Chunk>,
    pub blocks: Vec<String>,
    pub truncated: bool,
}

/// Keeps the longest prefix of `context` whose rendered blocks fit in `max_chars`.
/// Dropping from the tail keeps the result an order-preserving subsequence.
/// A top-ranked block that alone exceeds the budget is cut to fit rather than dropped.
pub fn pack_context(context: &[Chunk], max_chars: usize) -> PackedContext {
    let mut used = 0usize;
    let mut chunks = Vec::new();
    let mut blocks = Vec::new();
    for (i, chunk) in context.iter().enumerate() {
        let block = prompts::context_block(i, chunk);
        let cost = block.chars().count() + if blocks.is_empty() { 0 } else { 2 };
        if used + cost > max_chars {
            break;
        }
        used += cost;
        chunks.push(chunk.clone());
        blocks.push(block);
    }
    let mut clipped = false;
    match context.first() {
        Some(first) if chunks.is_empty() && max_chars > 0 => {
            let block: String = prompts::context_block(0, first).chars().take(max_chars).collect();
            chunks.push(first.clone());
            blocks.push(block);
            clipped = true;
        }
        _ => {}
    }
    let truncated = clipped || chunks.len() < context.len();
    PackedContext {
        chunks,
        blocks,
        truncated,
    }
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn Llm>, model: impl Into<String>, temperature: f32, max_context_chars: usize) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature,
            max_context_chars,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// An empty `context` still produces an answer; the record then has no
    /// supporting chunks and `is_grounded()` is false.
    pub fn synthesize(&self, query: &Query, context: &[Chunk]) -> Result<AnswerRecord, AppError> {
        let question = query.text.trim();
        if question.is_empty() {
            return Err(AppError::new(SYNTHESIS_FAILED, "Question must not be empty"));
        }

        let packed = pack_context(context, self.max_context_chars);
        if packed.truncated {
            tracing::warn!(
                requested = context.len(),
                sent = packed.chunks.len(),
                budget = self.max_context_chars,
                "context truncated to fit prompt budget"
            );
        }

        let prompt = if packed.chunks.is_empty() {
            prompts::context_free_prompt(question)
        } else {
            prompts::grounded_answer_prompt(question, &packed.blocks)
        };
        tracing::debug!(prompt_chars = prompt.chars().count(), chunks = packed.chunks.len(), "prompt built");

        let answer = self.llm.generate(&GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            temperature: self.temperature,
        })
        .map_err(|e| {
            if e.code == SYNTHESIS_FAILED {
                e
            } else {
                let retryable = e.retryable;
                AppError::new(SYNTHESIS_FAILED, "Generative model call failed")
                    .with_retryable(retryable)
                    .with_cause(e)
            }
        })?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AppError::new(SYNTHESIS_FAILED, "Generative model returned an empty answer"));
        }

        Ok(AnswerRecord {
            answer_text: answer.to_string(),
            supporting_chunks: packed.chunks,
            query: query.clone(),
            truncated: packed.truncated,
        })
    }
}
