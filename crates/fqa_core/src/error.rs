use serde::{Deserialize, Serialize};
use std::fmt;

pub const INIT_FAILED: &str = "INIT_FAILED";
pub const INDEX_LOAD_FAILED: &str = "INDEX_LOAD_FAILED";
pub const EMBEDDING_FAILED: &str = "EMBEDDING_FAILED";
pub const RETRIEVAL_FAILED: &str = "RETRIEVAL_FAILED";
pub const SYNTHESIS_FAILED: &str = "SYNTHESIS_FAILED";
pub const DANGLING_REFERENCE: &str = "DANGLING_REFERENCE";
pub const PIPELINE_QUERY_FAILED: &str = "PIPELINE_QUERY_FAILED";

/// Codes that leave the pipeline unusable. Everything else is scoped to one query.
const FATAL_CODES: &[&str] = &[INIT_FAILED, INDEX_LOAD_FAILED, DANGLING_REFERENCE];

/// Single structured error shape used across the core, the AI layer and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<AppError>>,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
            cause: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_cause(mut self, cause: AppError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Walks this error and its causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &AppError> {
        std::iter::successors(Some(self), |e| e.cause.as_deref())
    }

    /// The innermost error, i.e. the one that actually failed.
    pub fn root_cause(&self) -> &AppError {
        self.chain().last().unwrap_or(self)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.chain().any(|e| e.code == code)
    }

    pub fn is_fatal(&self) -> bool {
        self.chain().any(|e| FATAL_CODES.contains(&e.code.as_str()))
    }

    /// One line suitable for a terminal: outer message plus the root cause.
    pub fn one_line(&self) -> String {
        let root = self.root_cause();
        let mut line = if std::ptr::eq(root, self) {
            self.to_string()
        } else {
            format!("{self}: {root}")
        };
        if let Some(d) = root.details.as_deref() {
            line.push_str(" (");
            line.push_str(&d.replace('\n', " "));
            line.push(')');
        }
        line
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}
