//! Common error types for dermcap
//!
//! The first six variants are the pipeline's fatal conditions. Each one halts
//! the current validation pass; nothing is written to the backend after any of
//! them is raised.

use thiserror::Error;

use crate::canonical::StoredRecord;

/// Common result type for dermcap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across dermcap crates
#[derive(Error, Debug)]
pub enum Error {
    /// One or more required vendor columns are absent from the input file
    #[error("Schema mismatch: input file is missing required column(s): {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    /// A cell in a required numeric column could not be read as a number
    #[error("Invalid value in row {row}, column '{column}': '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    /// Session already has data in the backend; carries the stored rows for comparison
    #[error(
        "Session {session} already has {} uploaded record(s); upload refused",
        .conflicting.len()
    )]
    DuplicateSession {
        session: u32,
        conflicting: Vec<StoredRecord>,
    },

    /// Entered (patient, session) pair contradicts the reference record
    #[error(
        "Identity mismatch: session {session} is recorded for patient(s) {} but UPI {upi} was entered",
        .expected.join(", ")
    )]
    IdentityMismatch {
        upi: u64,
        session: u32,
        expected: Vec<String>,
    },

    /// Backend could not be reached or failed on its side (transport error or 5xx)
    #[error(
        "Backend unavailable{}: {body}",
        .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
    )]
    BackendUnavailable { status: Option<u16>, body: String },

    /// Backend answered but refused the request (4xx), e.g. a field failed its validation
    #[error("Backend rejected the request (HTTP {status}): {body}")]
    BackendRejected { status: u16, body: String },

    /// Invalid operator input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
