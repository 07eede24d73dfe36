//! Error types for shiftlog-core

use thiserror::Error;

/// Result type alias using shiftlog-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shiftlog-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Sync attempted without a configured local account
    #[error("No account configured. Set an account email before syncing.")]
    NoAccount,

    /// Network unreachable, timed out, or the server failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed payload (bad email, bad timestamp); never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A shift is already running
    #[error("A shift is already in progress")]
    ShiftAlreadyOpen,

    /// No shift is running
    #[error("No shift is in progress")]
    NoOpenShift,

    /// A break is already running on the current shift
    #[error("A break is already in progress")]
    BreakAlreadyOpen,

    /// No break is running on the current shift
    #[error("No break is in progress")]
    NoOngoingBreak,
}
