//! Error type shared by every fallible hubmap operation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The input document does not have a recognised shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid file pattern: {0}")]
    InvalidPattern(#[from] ignore::Error),
}
