use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use fqa_core::docstore::DocumentStoreWriter;
use fqa_core::domain::Chunk;
use fqa_core::error::AppError;
use fqa_core::forms::{chunk_form, FormText};
use serde::{Deserialize, Serialize};

use crate::embeddings::Embedder;
use crate::index::{IndexEntry, IndexManifest, VectorIndex};
use crate::pipeline::document_store_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexBuildInput {
    pub model: String,
    pub max_chunk_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexBuildSummary {
    pub forms: u32,
    pub chunks: u32,
    pub manifest: IndexManifest,
}

fn build_error(message: &str, path: &Path, err: impl std::fmt::Display) -> AppError {
    AppError::new("INDEX_BUILD_FAILED", message)
        .with_details(format!("path={}; err={}", path.display(), err))
}

fn sibling(index_dir: &Path, suffix: &str) -> Result<PathBuf, AppError> {
    let name = index_dir
        .file_name()
        .ok_or_else(|| {
            AppError::new("INDEX_BUILD_FAILED", "Index directory must name a directory")
                .with_details(format!("path={}", index_dir.display()))
        })?
        .to_string_lossy();
    Ok(index_dir.with_file_name(format!(".{name}.{suffix}")))
}

/// Where a build is assembled before it replaces `index_dir`.
pub fn staging_dir(index_dir: &Path) -> Result<PathBuf, AppError> {
    sibling(index_dir, "building")
}

fn backup_dir(index_dir: &Path) -> Result<PathBuf, AppError> {
    sibling(index_dir, "previous")
}

/// Removes a leftover directory from an interrupted build.
fn clear_leftover(path: &Path) -> Result<(), AppError> {
    match fs::symlink_metadata(path) {
        Err(_) => Ok(()),
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)
            .map_err(|e| build_error("Failed to remove leftover build directory", path, e)),
        Ok(_) => Err(build_error(
            "Build directory path is occupied by a file",
            path,
            "not a directory",
        )),
    }
}

fn write_build(staging: &Path, chunks: &[Chunk], index: &VectorIndex) -> Result<IndexManifest, AppError> {
    fs::create_dir_all(staging)
        .map_err(|e| build_error("Failed to create staging directory", staging, e))?;
    let mut writer = DocumentStoreWriter::create(&document_store_path(staging))?;
    writer.insert_chunks(chunks)?;
    drop(writer);
    index.write(staging)
}

/// Moves a finished build into place. The live directory is renamed aside
/// first and restored when the second rename fails.
fn swap_into_place(staging: &Path, index_dir: &Path) -> Result<(), AppError> {
    if !index_dir.exists() {
        return fs::rename(staging, index_dir)
            .map_err(|e| build_error("Failed to move build into place", index_dir, e));
    }

    let backup = backup_dir(index_dir)?;
    clear_leftover(&backup)?;
    fs::rename(index_dir, &backup)
        .map_err(|e| build_error("Failed to move previous build aside", index_dir, e))?;
    if let Err(e) = fs::rename(staging, index_dir) {
        if let Err(restore) = fs::rename(&backup, index_dir) {
            tracing::error!(
                backup = %backup.display(),
                error = %restore,
                "failed to restore previous build"
            );
        }
        return Err(build_error("Failed to move build into place", index_dir, e));
    }
    if let Err(e) = fs::remove_dir_all(&backup) {
        tracing::warn!(path = %backup.display(), error = %e, "failed to remove previous build");
    }
    Ok(())
}

/// Offline build: chunk every form, embed every chunk, then write the document
/// store and the vector index under `index_dir`. Replaces any previous build.
/// Everything is written to a staging directory first; `index_dir` only changes
/// once both the store and the index are complete, so a failed build leaves the
/// previous one loadable.
pub fn build_index(
    forms: &[FormText],
    index_dir: &Path,
    embedder: &dyn Embedder,
    input: &IndexBuildInput,
) -> Result<IndexBuildSummary, AppError> {
    let mut chunks: Vec<Chunk> = forms
        .iter()
        .flat_map(|f| chunk_form(f, input.max_chunk_chars))
        .collect();
    // Identical form entries produce identical chunk ids; keep the first.
    let mut seen: HashSet<String> = HashSet::new();
    chunks.retain(|c| seen.insert(c.chunk_id.clone()));
    if chunks.is_empty() {
        return Err(AppError::new(
            "INDEX_BUILD_FAILED",
            "No chunks available; the forms corpus has no text",
        ));
    }
    tracing::info!(forms = forms.len(), chunks = chunks.len(), model = %input.model, "embedding chunks");

    let mut entries = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let v = embedder.embed(&input.model, &chunk.text).map_err(|e| {
            let retryable = e.retryable;
            AppError::new("INDEX_BUILD_FAILED", "Failed to compute embeddings")
                .with_details(format!("chunk_id={}; form={}", chunk.chunk_id, chunk.source_form))
                .with_retryable(retryable)
                .with_cause(e)
        })?;
        entries.push(IndexEntry {
            chunk_id: chunk.chunk_id.clone(),
            embedding: v,
        });
    }
    let index = VectorIndex::build(&input.model, entries)?;

    let staging = staging_dir(index_dir)?;
    if let Some(parent) = staging.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| build_error("Failed to create index parent directory", parent, e))?;
    }
    clear_leftover(&staging)?;

    let manifest = match write_build(&staging, &chunks, &index) {
        Ok(m) => m,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                tracing::warn!(path = %staging.display(), error = %cleanup, "failed to remove staging directory");
            }
            return Err(e);
        }
    };
    swap_into_place(&staging, index_dir)?;
    tracing::info!(dims = manifest.dims, entries = manifest.entry_count, "index written");

    Ok(IndexBuildSummary {
        forms: forms.len() as u32,
        chunks: chunks.len() as u32,
        manifest,
    })
}
