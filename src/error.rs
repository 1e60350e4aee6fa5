// src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DigestError>;

/// Fatal conditions raised while parsing annotated SQL or reconciling it
/// against a FITS catalog.
#[derive(Debug, Error)]
pub enum DigestError {
    // ─────────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────────
    /// Downstream tooling matches on this exact text.
    #[error("Could not find a FITS column corresponding to {column}!")]
    MappingNotFound { column: String },

    // ─────────────────────────────────────────────────────────────────────────
    // DDL parsing
    // ─────────────────────────────────────────────────────────────────────────
    #[error("unsupported SQL type `{token}` for column {column}")]
    UnsupportedTypeToken { column: String, token: String },

    #[error("duplicate column {column} in table {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("table {table} is already defined; only one CREATE TABLE per file is supported")]
    TableRedefined { table: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────
    #[error("invalid FITS format code `{code}` for column {column}")]
    InvalidFormatCode { column: String, code: String },

    #[error("malformed FITS header: {0}")]
    Fits(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
