//! Error types for the data-loader crate.
//!
//! Covers both halves of the crate: reading the tabular movie/credits
//! sources and reading or writing the persisted artifact pair.

use thiserror::Error;

/// Errors that can occur while loading source tables or artifacts
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The CSV reader rejected a record
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Row in a data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A table is missing a column the join needs
    #[error("Missing column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    /// One half of the catalog/similarity pair is not on disk
    #[error("Artifact missing: {path}")]
    ArtifactMissing { path: String },

    /// Catalog and similarity matrix disagree on the number of movies
    #[error("Artifact mismatch: {catalog_len} catalog entries, {matrix_len}x{matrix_len} matrix")]
    ArtifactMismatch {
        catalog_len: usize,
        matrix_len: usize,
    },

    /// Artifact bytes are present but not in the expected format
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
