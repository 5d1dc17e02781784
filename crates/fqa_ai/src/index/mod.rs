//! Persisted vector index: `(chunk_id, embedding)` entries in insertion order
//! plus a manifest recording the model and dimensionality used to build them.
//!
//! Layout under the index directory:
//! - `index/manifest.json`
//! - `index/vectors.json`

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use fqa_core::error::{AppError, INDEX_LOAD_FAILED, RETRIEVAL_FAILED};
use fqa_core::forms::sha256_hex;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub mod similarity;

pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub format_version: u32,
    pub model: String,
    pub dims: u32,
    pub entry_count: u32,
    pub vectors_sha256: String,
    pub built_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub chunk_id: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk_id: String,
    pub score: f32,
}

/// Read-only after construction; safe to share across threads.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    model: String,
    dims: usize,
    entries: Vec<IndexEntry>,
    norms: Vec<f32>,
}

pub fn index_dir(root: &Path) -> PathBuf {
    root.join("index")
}

fn manifest_path(root: &Path) -> PathBuf {
    index_dir(root).join("manifest.json")
}

fn vectors_path(root: &Path) -> PathBuf {
    index_dir(root).join("vectors.json")
}

fn load_error(message: &str, path: &Path, err: impl std::fmt::Display) -> AppError {
    AppError::new(INDEX_LOAD_FAILED, message)
        .with_details(format!("path={}; err={}", path.display(), err))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", "Failed to write index file")
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", "Failed to finalize index file write")
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })
}

impl VectorIndex {
    /// Builds an in-memory index. Every embedding must share one non-zero
    /// dimensionality and ids must be unique.
    pub fn build(model: &str, entries: Vec<IndexEntry>) -> Result<Self, AppError> {
        let dims = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
        if entries.is_empty() || dims == 0 {
            return Err(AppError::new(
                "INDEX_BUILD_FAILED",
                "Index needs at least one non-empty embedding",
            ));
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for e in &entries {
            if e.embedding.len() != dims {
                return Err(AppError::new(
                    "INDEX_BUILD_FAILED",
                    "Embedding dimension mismatch across chunks",
                )
                .with_details(format!(
                    "expected={dims}; got={}; chunk_id={}",
                    e.embedding.len(),
                    e.chunk_id
                )));
            }
            if !seen.insert(e.chunk_id.as_str()) {
                return Err(AppError::new("INDEX_BUILD_FAILED", "Duplicate chunk id in index")
                    .with_details(format!("chunk_id={}", e.chunk_id)));
            }
        }
        Ok(Self::from_parts(model.to_string(), dims, entries))
    }

    fn from_parts(model: String, dims: usize, entries: Vec<IndexEntry>) -> Self {
        let norms = entries
            .iter()
            .map(|e| similarity::l2_norm(&e.embedding))
            .collect();
        Self {
            model,
            dims,
            entries,
            norms,
        }
    }

    /// Writes manifest and vectors under `root/index`, replacing any previous index.
    pub fn write(&self, root: &Path) -> Result<IndexManifest, AppError> {
        let dir = index_dir(root);
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to create index directory")
                .with_details(format!("path={}; err={}", dir.display(), e))
        })?;

        let vectors = serde_json::to_vec(&self.entries).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to encode index vectors")
                .with_details(e.to_string())
        })?;
        let built_at = OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to format build time")
                .with_details(e.to_string())
        })?;
        let manifest = IndexManifest {
            format_version: INDEX_FORMAT_VERSION,
            model: self.model.clone(),
            dims: self.dims as u32,
            entry_count: self.entries.len() as u32,
            vectors_sha256: sha256_hex(&vectors),
            built_at,
        };
        let manifest_json = serde_json::to_string_pretty(&manifest).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to encode index manifest")
                .with_details(e.to_string())
        })?;

        // Vectors first: a manifest only ever points at a complete vectors file.
        write_atomic(&vectors_path(root), &vectors)?;
        write_atomic(&manifest_path(root), manifest_json.as_bytes())?;
        Ok(manifest)
    }

    pub fn read_manifest(root: &Path) -> Result<IndexManifest, AppError> {
        let path = manifest_path(root);
        let bytes = fs::read(&path).map_err(|e| load_error("Failed to read index manifest", &path, e))?;
        let manifest: IndexManifest = serde_json::from_slice(&bytes)
            .map_err(|e| load_error("Index manifest is corrupt", &path, e))?;
        if manifest.format_version != INDEX_FORMAT_VERSION {
            return Err(AppError::new(INDEX_LOAD_FAILED, "Unsupported index format version")
                .with_details(format!(
                    "found={}; supported={INDEX_FORMAT_VERSION}",
                    manifest.format_version
                )));
        }
        Ok(manifest)
    }

    /// Loads and verifies the persisted index against the active embedding model.
    pub fn load(root: &Path, model: &str, dims: usize) -> Result<Self, AppError> {
        let manifest = Self::read_manifest(root)?;
        if manifest.model != model {
            return Err(AppError::new(
                INDEX_LOAD_FAILED,
                "Index was built with a different embedding model",
            )
            .with_details(format!("index_model={}; active_model={model}", manifest.model)));
        }
        if manifest.dims as usize != dims {
            return Err(AppError::new(
                INDEX_LOAD_FAILED,
                "Index dimensionality does not match the embedding service",
            )
            .with_details(format!("index_dims={}; service_dims={dims}", manifest.dims)));
        }

        let path = vectors_path(root);
        let bytes = fs::read(&path).map_err(|e| load_error("Failed to read index vectors", &path, e))?;
        if sha256_hex(&bytes) != manifest.vectors_sha256 {
            return Err(AppError::new(INDEX_LOAD_FAILED, "Index vectors checksum mismatch")
                .with_details(format!("path={}", path.display())));
        }
        let entries: Vec<IndexEntry> = serde_json::from_slice(&bytes)
            .map_err(|e| load_error("Index vectors are corrupt", &path, e))?;
        if entries.len() != manifest.entry_count as usize {
            return Err(AppError::new(INDEX_LOAD_FAILED, "Index entry count mismatch")
                .with_details(format!(
                    "manifest={}; found={}",
                    manifest.entry_count,
                    entries.len()
                )));
        }

        Self::build(&manifest.model, entries).map_err(|e| {
            AppError::new(INDEX_LOAD_FAILED, "Index vectors are inconsistent").with_cause(e)
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunk_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.chunk_id.as_str())
    }

    /// Top `k` entries by cosine similarity, highest first. Ties keep insertion order.
    /// When `k` exceeds the entry count every entry is returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, AppError> {
        if k == 0 {
            return Err(AppError::new(RETRIEVAL_FAILED, "k must be a positive integer"));
        }
        if query.len() != self.dims {
            return Err(AppError::new(
                RETRIEVAL_FAILED,
                "Query embedding dims do not match index dims",
            )
            .with_details(format!("index_dims={}; query_dims={}", self.dims, query.len())));
        }
        let qnorm = similarity::l2_norm(query);
        if qnorm == 0.0 || !qnorm.is_finite() {
            return Err(AppError::new(
                RETRIEVAL_FAILED,
                "Query embedding norm is zero or not finite",
            ));
        }

        let mut hits: Vec<(usize, f32)> = self
            .entries
            .iter()
            .zip(self.norms.iter())
            .enumerate()
            .map(|(i, (e, &n))| (i, similarity::cosine_similarity(query, &e.embedding, qnorm, n)))
            .collect();

        // Stable sort: equal scores stay in insertion order.
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(k);

        Ok(hits
            .into_iter()
            .map(|(i, score)| SearchHit {
                chunk_id: self.entries[i].chunk_id.clone(),
                score,
            })
            .collect())
    }
}
