//! Domain error taxonomy

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by the store, the lifecycle rules and the org tree
#[derive(Debug, Error, Diagnostic)]
pub enum HabError {
    /// Missing or malformed input; nothing was written
    #[error("validation failed: {0}")]
    #[diagnostic(code(hab::validation))]
    Validation(String),

    #[error("{kind} not found: {key}")]
    #[diagnostic(code(hab::not_found))]
    NotFound { kind: &'static str, key: String },

    #[error("conflict: {0}")]
    #[diagnostic(code(hab::conflict), help("identifiers (matricules) must be unique"))]
    Conflict(String),

    #[error("invalid date: '{0}'")]
    #[diagnostic(code(hab::invalid_date), help("use YYYY-MM-DD"))]
    InvalidDate(String),

    #[error("organizational structure: {0}")]
    #[diagnostic(code(hab::org))]
    Org(String),

    #[error("database error: {0}")]
    #[diagnostic(code(hab::database))]
    Database(#[from] rusqlite::Error),

    #[error("encoding error: {0}")]
    #[diagnostic(code(hab::encoding))]
    Encoding(#[from] serde_json::Error),
}

impl HabError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        HabError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

pub type HabResult<T> = std::result::Result<T, HabError>;
