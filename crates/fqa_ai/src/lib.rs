pub mod adapters;
pub mod build;
pub mod embeddings;
pub(crate) mod http;
pub mod index;
pub mod llm;
pub mod ollama;
pub mod pipeline;
pub mod retrieve;
pub mod synthesize;
