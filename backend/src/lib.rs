//! # Rateload - bulk upload pipeline for issuer/instrument tax ratings
//!
//! Rateload ingests delimited UTF-8 text files of credit/tax ratings,
//! validates each row against reference data and business rules, and writes
//! rating records with a per-row result ledger and aggregate rollup.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Upload file │────▶│   Parser    │────▶│  Validator  │────▶│ Rating      │
//! │ (UTF-8 |/⇥) │     │ (sniffing)  │     │ (rules 1-8) │     │ records     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                  orchestrated per row, row failures isolated
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rateload::{process_upload, UploadJob, InMemoryRatingStore, InMemoryReferenceData};
//!
//! let refs = InMemoryReferenceData::from_seed_file("refs.txt")?;
//! let store = InMemoryRatingStore::new();
//! let mut job = UploadJob::new("ratings.txt", "analyst");
//! let ledger = process_upload(&mut job, &bytes, &refs, &store)?;
//! println!("{} OK, {} errors", job.ok_count, job.error_count);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (grades, statuses, records)
//! - [`parser`] - Delimiter-sniffing text parsing
//! - [`validation`] - Row validation rules
//! - [`store`] - Reference-data and record-store collaborators
//! - [`upload`] - Job state machine and orchestrator
//! - [`registry`] - On-disk upload archive
//! - [`audit`] - Structured audit trail
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Collaborators
pub mod store;

// Upload orchestration
pub mod upload;

// Persistence
pub mod registry;

// Audit
pub mod audit;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{AcceptError, ParseError, ServerError, StoreError, UploadError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Instrument,
    Issuer,
    RatingDraft,
    RatingGrade,
    RatingRecord,
    RatingStatus,
    RiskLevel,
};

// =============================================================================
// Re-exports - Parser
// =============================================================================

pub use parser::{parse_bytes, parse_file, parse_text, sniff_delimiter, FieldMap, ParseOutcome, ParsedRow};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{parse_date, validate_row, RowValidation, DATE_FORMAT, REQUIRED_FIELDS};

// =============================================================================
// Re-exports - Stores
// =============================================================================

pub use store::{InMemoryRatingStore, InMemoryReferenceData, RatingStore, ReferenceData};

// =============================================================================
// Re-exports - Upload
// =============================================================================

pub use upload::{process_upload, RowStatus, UploadJob, UploadRowResult, UploadState};

// =============================================================================
// Re-exports - Registry (Archive)
// =============================================================================

pub use registry::{StoredUpload, UploadArchive};

// =============================================================================
// Re-exports - Audit
// =============================================================================

pub use audit::{AuditAction, AuditEvent, AUDIT_TRAIL};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, JobView, RowItemView, UploadAccepted, UploadStats};

// Server
pub mod server {
    pub use crate::api::server::{start_server, AppState};
}
