use fqa_core::error::AppError;

pub mod openai_llm;

pub use openai_llm::OpenAiLlm;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
}

/// Opaque text generator. Implementations bound every call with a timeout.
pub trait Llm: Send + Sync {
    fn generate(&self, req: &GenerateRequest<'_>) -> Result<String, AppError>;
}
