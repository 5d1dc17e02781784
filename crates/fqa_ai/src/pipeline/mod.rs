use std::path::{Path, PathBuf};
use std::sync::Arc;

use fqa_core::config::{validate_credential, PipelineConfig};
use fqa_core::docstore::DocumentStore;
use fqa_core::domain::{AnswerRecord, Query};
use fqa_core::error::{AppError, DANGLING_REFERENCE, INIT_FAILED, PIPELINE_QUERY_FAILED};

use crate::embeddings::{probe_dims, Embedder, OllamaEmbedder};
use crate::http::timeout_from_secs;
use crate::index::VectorIndex;
use crate::llm::{Llm, OpenAiLlm};
use crate::ollama::OllamaClient;
use crate::retrieve::Retriever;
use crate::synthesize::Synthesizer;

mod state;

pub use state::{PipelineEvent, PipelineState};

pub const DOCUMENT_STORE_FILE: &str = "documents.sqlite";

pub fn document_store_path(index_dir: &Path) -> PathBuf {
    index_dir.join(DOCUMENT_STORE_FILE)
}

/// Everything a query needs, built once by `initialize` and never mutated.
#[derive(Clone)]
pub struct PipelineHandle {
    retriever: Retriever,
    synthesizer: Synthesizer,
    index_dir: PathBuf,
    chunk_count: usize,
    dims: usize,
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("index_dir", &self.index_dir)
            .field("chunk_count", &self.chunk_count)
            .field("dims", &self.dims)
            .field("top_k", &self.retriever.top_k())
            .field("temperature", &self.synthesizer.temperature())
            .finish()
    }
}

impl PipelineHandle {
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }
}

fn init_error(message: &str, cause: AppError) -> AppError {
    if cause.code == INIT_FAILED {
        return cause;
    }
    AppError::new(INIT_FAILED, message).with_cause(cause)
}

/// Builds the production services (local embedding server, OpenAI chat model)
/// and initializes the pipeline with them.
pub fn initialize(config: &PipelineConfig) -> Result<PipelineHandle, AppError> {
    config
        .validate()
        .map_err(|e| init_error("Invalid pipeline configuration", e))?;
    let key = validate_credential(config.openai_api_key.as_deref())?;
    let timeout = timeout_from_secs(config.request_timeout_secs);

    let client = OllamaClient::new(&config.embedding_base_url)
        .map_err(|e| init_error("Invalid embedding service configuration", e))?
        .with_timeout(timeout);
    let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(client));
    let llm: Arc<dyn Llm> = Arc::new(OpenAiLlm::new(key, &config.openai_base_url, timeout));

    initialize_with(config, embedder, llm)
}

/// Initializes against caller-supplied services. Fails fast: on success every
/// index entry resolves to a stored chunk and the index matches the embedder.
pub fn initialize_with(
    config: &PipelineConfig,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn Llm>,
) -> Result<PipelineHandle, AppError> {
    config
        .validate()
        .map_err(|e| init_error("Invalid pipeline configuration", e))?;
    validate_credential(config.openai_api_key.as_deref())?;

    let index_dir = config.index_dir.clone();
    if !index_dir.is_dir() {
        return Err(AppError::new(INIT_FAILED, "Vector index directory not found")
            .with_details(format!("path={}", index_dir.display())));
    }

    tracing::info!(path = %index_dir.display(), "loading document store");
    let store = DocumentStore::load(&document_store_path(&index_dir))
        .map_err(|e| init_error("Failed to load document store", e))?;

    tracing::info!(model = %config.embedding_model, "probing embedding service");
    let dims = probe_dims(embedder.as_ref(), &config.embedding_model)
        .map_err(|e| init_error("Embedding service is unavailable", e))?;

    tracing::info!(dims, "loading vector index");
    let index = VectorIndex::load(&index_dir, &config.embedding_model, dims)
        .map_err(|e| init_error("Failed to load vector index", e))?;

    if let Some(missing) = index.chunk_ids().find(|id| !store.contains(id)) {
        return Err(AppError::new(
            INIT_FAILED,
            "Vector index and document store are out of sync",
        )
        .with_cause(
            AppError::new(DANGLING_REFERENCE, "Index references a missing chunk")
                .with_details(format!("chunk_id={missing}")),
        ));
    }

    let chunk_count = index.len();
    tracing::info!(chunks = chunk_count, dims, top_k = config.top_k, "pipeline ready");

    let retriever = Retriever::new(
        embedder,
        Arc::new(index),
        Arc::new(store),
        config.embedding_model.clone(),
        config.top_k as usize,
    );
    let synthesizer = Synthesizer::new(
        llm,
        config.chat_model.clone(),
        config.temperature,
        config.max_context_chars,
    );

    Ok(PipelineHandle {
        retriever,
        synthesizer,
        index_dir,
        chunk_count,
        dims,
    })
}

/// Retrieves context and synthesizes an answer. Any failure comes back as a
/// single `PIPELINE_QUERY_FAILED` error carrying the original cause; no retries.
pub fn answer(
    handle: &PipelineHandle,
    query_text: &str,
    language_hint: Option<&str>,
) -> Result<AnswerRecord, AppError> {
    let query = Query::new(query_text.trim()).with_language(language_hint);

    let run = || -> Result<AnswerRecord, AppError> {
        let retrieved = handle.retriever.retrieve(&query)?;
        handle.synthesizer.synthesize(&query, &retrieved.into_chunks())
    };

    run().map_err(|cause| {
        let retryable = cause.retryable;
        if cause.is_fatal() {
            tracing::error!(error = %cause, "fatal integrity error while answering");
        } else {
            tracing::warn!(error = %cause, retryable, "query failed");
        }
        AppError::new(PIPELINE_QUERY_FAILED, "Failed to answer the question")
            .with_retryable(retryable)
            .with_cause(cause)
    })
}
