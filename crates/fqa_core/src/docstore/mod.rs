use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection};

use crate::db;
use crate::domain::Chunk;
use crate::error::AppError;

/// Build-time writer over the SQLite document store.
pub struct DocumentStoreWriter {
    conn: Connection,
}

impl DocumentStoreWriter {
    /// Opens (creating if needed) and migrates the store at `path`.
    pub fn create(path: &Path) -> Result<Self, AppError> {
        let mut conn = db::open(path)?;
        db::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn from_connection(mut conn: Connection) -> Result<Self, AppError> {
        db::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn clear(&mut self) -> Result<(), AppError> {
        self.conn.execute("DELETE FROM chunks", []).map_err(|e| {
            AppError::new("DOCSTORE_WRITE_FAILED", "Failed to clear document store")
                .with_details(e.to_string())
        })?;
        Ok(())
    }

    /// Appends chunks in one transaction; `position` preserves insertion order.
    /// Re-inserting an existing `chunk_id` replaces it in place.
    pub fn insert_chunks(&mut self, chunks: &[Chunk]) -> Result<u32, AppError> {
        let tx = self.conn.transaction().map_err(|e| {
            AppError::new("DB_TX_FAILED", "Failed to start document store transaction")
                .with_details(e.to_string())
        })?;

        let mut next_position: i64 = tx
            .query_row("SELECT COALESCE(MAX(position) + 1, 0) FROM chunks", [], |row| row.get(0))
            .map_err(|e| {
                AppError::new("DOCSTORE_WRITE_FAILED", "Failed to read document store position")
                    .with_details(e.to_string())
            })?;

        let mut written = 0u32;
        {
            let mut stmt = tx
                .prepare(
                    r#"
          INSERT INTO chunks(chunk_id, source_form, page, ordinal, text, text_sha256, position)
          VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
          ON CONFLICT(chunk_id) DO UPDATE SET
            source_form = excluded.source_form,
            page = excluded.page,
            ordinal = excluded.ordinal,
            text = excluded.text,
            text_sha256 = excluded.text_sha256
        "#,
                )
                .map_err(|e| {
                    AppError::new("DOCSTORE_WRITE_FAILED", "Failed to prepare chunk insert")
                        .with_details(e.to_string())
                })?;

            for c in chunks {
                stmt.execute(params![
                    c.chunk_id,
                    c.source_form,
                    c.page,
                    c.ordinal,
                    c.text,
                    c.text_sha256,
                    next_position
                ])
                .map_err(|e| {
                    AppError::new("DOCSTORE_WRITE_FAILED", "Failed to insert chunk")
                        .with_details(format!("chunk_id={}; err={}", c.chunk_id, e))
                })?;
                next_position += 1;
                written += 1;
            }
        }

        tx.commit().map_err(|e| {
            AppError::new("DB_TX_FAILED", "Failed to commit document store transaction")
                .with_details(e.to_string())
        })?;
        Ok(written)
    }

    pub fn into_store(self) -> Result<DocumentStore, AppError> {
        DocumentStore::from_connection(&self.conn)
    }
}

/// Chunk text and metadata, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    chunks: Vec<Chunk>,
    by_id: HashMap<String, usize>,
}

impl DocumentStore {
    /// Reads every chunk from an existing store. The file is not created when missing.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let conn = db::open_read_only(path).map_err(|e| {
            AppError::new("DOCSTORE_LOAD_FAILED", "Document store is missing or unreadable")
                .with_cause(e)
        })?;
        let applied = db::applied_migrations(&conn).map_err(|e| {
            AppError::new("DOCSTORE_LOAD_FAILED", "Document store has no schema")
                .with_cause(e)
        })?;
        if !applied.contains("0001_document_store.sql") {
            return Err(AppError::new(
                "DOCSTORE_LOAD_FAILED",
                "Document store schema is out of date",
            ));
        }
        let store = Self::from_connection(&conn)?;
        tracing::debug!(path = %path.display(), chunks = store.len(), "document store loaded");
        Ok(store)
    }

    pub fn from_connection(conn: &Connection) -> Result<Self, AppError> {
        let mut stmt = conn
            .prepare(
                "SELECT chunk_id, source_form, page, ordinal, text, text_sha256 FROM chunks ORDER BY position ASC",
            )
            .map_err(|e| {
                AppError::new("DOCSTORE_LOAD_FAILED", "Failed to query chunks")
                    .with_details(e.to_string())
            })?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Chunk {
                    chunk_id: row.get(0)?,
                    source_form: row.get(1)?,
                    page: row.get(2)?,
                    ordinal: row.get(3)?,
                    text: row.get(4)?,
                    text_sha256: row.get(5)?,
                })
            })
            .map_err(|e| {
                AppError::new("DOCSTORE_LOAD_FAILED", "Failed to read chunks")
                    .with_details(e.to_string())
            })?;

        let mut chunks = Vec::new();
        for r in rows {
            chunks.push(r.map_err(|e| {
                AppError::new("DOCSTORE_LOAD_FAILED", "Failed to read chunk row")
                    .with_details(e.to_string())
            })?);
        }
        Ok(Self::from_chunks(chunks))
    }

    /// Later duplicates of a `chunk_id` are ignored.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let mut out = Self::default();
        for c in chunks {
            if out.by_id.contains_key(&c.chunk_id) {
                continue;
            }
            out.by_id.insert(c.chunk_id.clone(), out.chunks.len());
            out.chunks.push(c);
        }
        out
    }

    pub fn get(&self, chunk_id: &str) -> Option<&Chunk> {
        self.by_id.get(chunk_id).map(|&i| &self.chunks[i])
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.by_id.contains_key(chunk_id)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All chunks in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}
