use fqa_core::error::AppError;

/// Maps text to a fixed-length vector. Implementations must be deterministic
/// for a given `(model, input)` pair so that an index can be rebuilt reproducibly.
pub trait Embedder: Send + Sync {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

pub mod ollama_embed;

pub use ollama_embed::OllamaEmbedder;

/// Text used to discover the dimensionality of the active embedding model.
pub const DIMENSION_PROBE: &str = "dimension probe";

/// Embeds a fixed probe string and returns the vector length.
pub fn probe_dims(embedder: &dyn Embedder, model: &str) -> Result<usize, AppError> {
    let v = embedder.embed(model, DIMENSION_PROBE)?;
    if v.is_empty() {
        return Err(AppError::new(
            fqa_core::error::EMBEDDING_FAILED,
            "Embedding service returned an empty vector",
        ));
    }
    Ok(v.len())
}
