use std::sync::Arc;

use fqa_core::docstore::DocumentStore;
use fqa_core::domain::{Query, RetrievalHit, RetrievalResult};
use fqa_core::error::{AppError, DANGLING_REFERENCE, EMBEDDING_FAILED, RETRIEVAL_FAILED};

use crate::embeddings::Embedder;
use crate::index::VectorIndex;

/// Turns a query into ranked supporting chunks.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    store: Arc<DocumentStore>,
    model: String,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        store: Arc<DocumentStore>,
        model: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            model: model.into(),
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn retrieve(&self, query: &Query) -> Result<RetrievalResult, AppError> {
        let q = query.text.trim();
        if q.is_empty() {
            return Err(AppError::new(RETRIEVAL_FAILED, "Query must not be empty"));
        }

        let qv = self.embedder.embed(&self.model, q).map_err(|e| {
            if e.code == EMBEDDING_FAILED {
                e
            } else {
                let retryable = e.retryable;
                AppError::new(EMBEDDING_FAILED, "Failed to embed query")
                    .with_retryable(retryable)
                    .with_cause(e)
            }
        })?;
        if qv.len() != self.index.dims() {
            return Err(AppError::new(
                EMBEDDING_FAILED,
                "Embedding service returned a vector of unexpected dimensionality",
            )
            .with_details(format!("expected={}; got={}", self.index.dims(), qv.len())));
        }

        let hits = self.index.search(&qv, self.top_k)?;

        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            let chunk = self.store.get(&hit.chunk_id).ok_or_else(|| {
                tracing::error!(chunk_id = %hit.chunk_id, "index entry has no document");
                AppError::new(
                    DANGLING_REFERENCE,
                    "Index references a chunk missing from the document store",
                )
                .with_details(format!("chunk_id={}", hit.chunk_id))
            })?;
            tracing::debug!(chunk_id = %hit.chunk_id, score = hit.score, form = %chunk.source_form, "retrieved");
            out.push(RetrievalHit {
                chunk: chunk.clone(),
                score: hit.score,
            });
        }

        Ok(RetrievalResult { hits: out })
    }
}
