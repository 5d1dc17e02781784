use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub mod chunking;

pub use chunking::{chunk_form, normalize_text, sha256_hex, DEFAULT_MAX_CHUNK_CHARS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormField {
    pub label: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
}

fn default_field_type() -> String {
    "text".to_string()
}

/// One entry of the preprocessing output. Both the structured-forms shape and
/// the plain `{source_form, page, text}` pair shape are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CorpusEntry {
    StructuredForm {
        form_name: String,
        #[serde(default)]
        fields: Vec<FormField>,
        raw_text: String,
    },
    Page {
        source_form: String,
        #[serde(default)]
        page: Option<u32>,
        text: String,
    },
}

/// Text of one form (or one page of it) ready for chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormText {
    pub source_form: String,
    pub page: Option<u32>,
    pub text: String,
}

impl From<CorpusEntry> for FormText {
    fn from(entry: CorpusEntry) -> Self {
        match entry {
            CorpusEntry::StructuredForm {
                form_name, raw_text, ..
            } => FormText {
                source_form: form_name,
                page: None,
                text: raw_text,
            },
            CorpusEntry::Page {
                source_form,
                page,
                text,
            } => FormText {
                source_form,
                page,
                text,
            },
        }
    }
}

pub fn parse_corpus(json: &str) -> Result<Vec<FormText>, AppError> {
    let entries: Vec<CorpusEntry> = serde_json::from_str(json).map_err(|e| {
        AppError::new("FORMS_INVALID", "Failed to decode forms corpus")
            .with_details(e.to_string())
    })?;

    let mut out = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let form: FormText = entry.into();
        if form.source_form.trim().is_empty() {
            return Err(AppError::new("FORMS_INVALID", "Form entry is missing a name")
                .with_details(format!("entry={i}")));
        }
        out.push(form);
    }
    Ok(out)
}

pub fn read_corpus_file(path: &Path) -> Result<Vec<FormText>, AppError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        AppError::new("FORMS_READ_FAILED", "Failed to read forms corpus")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    parse_corpus(&raw).map_err(|e| {
        let details = format!("path={}; {}", path.display(), e.details.clone().unwrap_or_default());
        e.with_details(details)
    })
}
