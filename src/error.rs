//! Error types for the translation-review library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the application.

use thiserror::Error;

/// Errors that can occur in the translation-review application.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Spreadsheet could not be opened or a sheet could not be read
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Network, authentication or protocol failure talking to the scoring service
    #[error("Transport error: {0}")]
    Transport(String),

    /// The completion text carried no fenced code block
    #[error("Did not find a fenced block in the response, unable to parse the payload")]
    MissingFence,

    /// The scoring run terminated with a status other than `completed`
    #[error("Scoring run finished with status {status}")]
    RunNotCompleted {
        /// Terminal status reported by the service
        status: String,
    },

    /// Input or response failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `ReviewError`
pub type Result<T> = std::result::Result<T, ReviewError>;

impl From<reqwest::Error> for ReviewError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
