//! Typed errors for the places where callers need to branch on the failure.
//! Everything else flows through `anyhow` with context strings.

use thiserror::Error;

/// Validation failures raised by the song form before anything touches the
/// database. The message is shown verbatim in the form's error line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is required.")]
    Required(&'static str),
    #[error("{field} must be a whole number, got {value:?}.")]
    NotANumber { field: &'static str, value: String },
}

/// Failures while bulk-importing songs from a CSV file.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read CSV file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write imported songs: {0}")]
    Database(#[from] rusqlite::Error),
}
