//! Common error types for LMP

use thiserror::Error;

/// Common result type for LMP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across LMP crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Access to a path or resource is not permitted
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// External command failed or could not be spawned
    #[error("Command failed: {0}")]
    Command(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The error's message without the category prefix
    pub fn detail(&self) -> String {
        match self {
            Error::Io(e) => e.to_string(),
            Error::Json(e) => e.to_string(),
            Error::Config(m)
            | Error::NotFound(m)
            | Error::InvalidInput(m)
            | Error::Forbidden(m)
            | Error::Command(m)
            | Error::Internal(m) => m.clone(),
        }
    }
}
