//! Bulk upload orchestration.
//!
//! - [`job`] - the upload job state machine and per-row result ledger
//! - [`processor`] - drives a job through parse → validate → create

pub mod job;
pub mod processor;

pub use job::{RowStatus, UploadJob, UploadRowResult, UploadState};
pub use processor::process_upload;
