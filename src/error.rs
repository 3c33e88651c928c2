//! Error types for the contig-sieve library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid length '{value}' for sequence '{id}'")]
    InvalidLength { id: String, value: String },

    #[error("Duplicate sequence id '{0}'")]
    DuplicateId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported filter method '{0}'")]
    UnsupportedMethod(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error in stage {stage}: {reason}")]
    Configuration { stage: usize, reason: String },

    #[error("Numerical fit failure: {0}")]
    NumericalFit(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, SieveError>;
