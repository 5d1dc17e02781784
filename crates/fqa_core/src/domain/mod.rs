use serde::{Deserialize, Serialize};

/// A unit of form text. Immutable once built; the embedding for `chunk_id`
/// lives only in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_id: String,
    pub source_form: String,
    pub page: Option<u32>,
    pub ordinal: u32,
    pub text: String,
    pub text_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub language_hint: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language_hint: None,
        }
    }

    pub fn with_language(mut self, lang: Option<&str>) -> Self {
        self.language_hint = lang
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.to_lowercase());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Hits in descending score order, at most `k` long.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievalHit>,
}

impl RetrievalResult {
    pub fn chunk_ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.chunk.chunk_id.as_str()).collect()
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.hits.into_iter().map(|h| h.chunk).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecord {
    pub answer_text: String,
    /// The chunks actually sent to the model, most relevant first.
    pub supporting_chunks: Vec<Chunk>,
    pub query: Query,
    /// Set when the context budget forced trailing chunks out of the prompt.
    pub truncated: bool,
}

impl AnswerRecord {
    /// False when the model answered without any supporting context.
    pub fn is_grounded(&self) -> bool {
        !self.supporting_chunks.is_empty()
    }

    /// Distinct source forms in first-seen order.
    pub fn source_forms(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for c in &self.supporting_chunks {
            if !out.contains(&c.source_form.as_str()) {
                out.push(c.source_form.as_str());
            }
        }
        out
    }
}
