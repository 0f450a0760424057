//! Error types for the replication pipeline
//!
//! Every failure is terminal: the report is all-or-nothing, so errors
//! propagate to `main` and halt the run.

use thiserror::Error;

/// Schema violations found while loading or addressing the dataset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Missing expected column '{0}'")]
    MissingColumn(String),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Column '{column}' holds labels, not numbers")]
    NotNumeric { column: String },

    #[error("Column '{column}' holds numbers, not labels")]
    NotCategorical { column: String },

    #[error("Invalid value '{value}' in column '{column}' (row {row})")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Value {value} in column '{column}' (row {row}) outside [{min}, {max}]")]
    OutOfRange {
        column: String,
        row: usize,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Missing value in required column '{column}' (row {row})")]
    MissingValue { column: String, row: usize },
}

/// Errors raised by the analysis pipeline
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("No cached dataset at {path} and no download URL configured (set data.url or pass --data-url)")]
    NoSource { path: String },

    #[error("Checksum mismatch for {path}: expected {expected}, found {found}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Comparison '{comparison}': group '{group}' of column '{column}' is empty")]
    EmptyGroup {
        comparison: String,
        column: String,
        group: String,
    },

    #[error("Model '{model}' failed: {reason}")]
    Model { model: String, reason: String },

    #[error("Failed to render {what}: {reason}")]
    Render { what: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
