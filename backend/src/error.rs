//! Error types for the rateload upload pipeline.
//!
//! This module defines a hierarchy of error types following the pipeline's
//! failure taxonomy:
//!
//! - [`ParseError`] - file-level fatal errors (abort the whole job)
//! - [`StoreError`] - record-store constraint violations (become row errors)
//! - [`UploadError`] - operational misuse of the upload state machine
//! - [`AcceptError`] - upload acceptance gate rejections
//! - [`ServerError`] - top-level HTTP errors
//!
//! Row-level data-quality problems are NOT errors in this hierarchy: the
//! validator accumulates them as plain messages and the orchestrator captures
//! them into the row ledger without unwinding.

use thiserror::Error;

use crate::upload::UploadState;

// =============================================================================
// File-Level Parse Errors
// =============================================================================

/// Fatal errors while parsing an upload file.
///
/// Any of these aborts the whole job before a single row is processed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// File bytes are not valid UTF-8. No fallback encoding is attempted.
    #[error("File is not valid UTF-8: {0}")]
    Encoding(String),

    /// File is empty or whitespace-only.
    #[error("Upload file is empty")]
    EmptyFile,

    /// File structure is unusable (no header+data, undetectable delimiter).
    #[error("Malformed upload file: {0}")]
    Malformed(String),
}

// =============================================================================
// Record Store Errors
// =============================================================================

/// Errors from the rating record store.
///
/// Creation failures are caught by the orchestrator and converted into
/// row-level ERROR outcomes; they never abort a batch.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Issuer code not present in reference data.
    #[error("Issuer with code '{0}' does not exist")]
    UnknownIssuer(String),

    /// Instrument code not present in reference data.
    #[error("Instrument with code '{0}' does not exist")]
    UnknownInstrument(String),

    /// valid_to is not strictly after valid_from.
    #[error("Validity window is empty: valid_to {valid_to} is not after valid_from {valid_from}")]
    InvalidWindow {
        valid_from: chrono::NaiveDate,
        valid_to: chrono::NaiveDate,
    },

    /// An ACTIVE rating for the same (issuer, instrument) pair already
    /// covers part of the requested validity window.
    #[error("Active rating for {issuer}/{instrument} overlaps an existing record valid from {existing_from} to {existing_to}")]
    OverlapConflict {
        issuer: String,
        instrument: String,
        existing_from: chrono::NaiveDate,
        /// "open" when the existing record has no end date.
        existing_to: String,
    },
}

// =============================================================================
// Upload State Machine Errors
// =============================================================================

/// Operational errors: caller misuse of the upload lifecycle.
///
/// These are surfaced immediately with no state mutation.
#[derive(Debug, Error)]
pub enum UploadError {
    /// `process` was invoked on a job that already left PENDING.
    #[error("Upload has already been processed (state: {state})")]
    AlreadyProcessed { state: UploadState },

    /// `reject` is only legal before processing starts.
    #[error("Only pending uploads can be rejected (state: {state})")]
    NotPending { state: UploadState },

    /// Unknown job id.
    #[error("Upload not found: {0}")]
    NotFound(uuid::Uuid),
}

// =============================================================================
// Upload Acceptance Gate Errors
// =============================================================================

/// Rejections from the upload acceptance gate, checked before a job exists.
#[derive(Debug, Error)]
pub enum AcceptError {
    /// Only plain-text delimited files are accepted.
    #[error("Unsupported file extension '.{0}': export as pipe- or tab-delimited plain text (.txt or .tsv)")]
    UnsupportedExtension(String),

    /// File exceeds the configured size ceiling.
    #[error("File is too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    /// Raw bytes must decode as UTF-8 before a job is even created.
    #[error("File is not valid UTF-8 text")]
    NotUtf8,

    /// No file field in the request.
    #[error("No file provided")]
    MissingFile,
}

// =============================================================================
// Server Errors (top-level)
// =============================================================================

/// HTTP server errors wrapping the lower layers for status-code mapping.
#[derive(Debug, Error)]
pub enum ServerError {
    /// File-level parse failure.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Upload lifecycle misuse.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Acceptance gate rejection.
    #[error("Rejected upload: {0}")]
    Accept(#[from] AcceptError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for whole-file parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for record-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for upload lifecycle operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_messages() {
        assert!(ParseError::EmptyFile.to_string().contains("empty"));
        let err = ParseError::Malformed("must have headers separated by pipe or tab".into());
        assert!(err.to_string().contains("pipe or tab"));
    }

    #[test]
    fn test_overlap_message_names_pair() {
        let err = StoreError::OverlapConflict {
            issuer: "ABC".into(),
            instrument: "BOND1".into(),
            existing_from: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            existing_to: "open".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ABC/BOND1"));
        assert!(msg.contains("overlaps"));
        assert!(msg.contains("2024-01-01"));
    }

    #[test]
    fn test_error_conversion_chain() {
        // UploadError -> ServerError
        let upload_err = UploadError::AlreadyProcessed {
            state: UploadState::Completed,
        };
        let server_err: ServerError = upload_err.into();
        assert!(server_err.to_string().contains("already been processed"));

        // AcceptError -> ServerError
        let accept_err = AcceptError::UnsupportedExtension("xlsx".into());
        let server_err: ServerError = accept_err.into();
        assert!(server_err.to_string().contains("xlsx"));
    }
}
