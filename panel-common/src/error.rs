//! Common error types for the panel schedule workspace

use thiserror::Error;

/// Common result type for panel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the panel crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (poisoned lock, broken collaborator)
    #[error("Internal error: {0}")]
    Internal(String),
}
