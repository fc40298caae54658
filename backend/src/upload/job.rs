//! Upload job lifecycle data and the per-row result ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{UploadError, UploadResult};
use crate::parser::FieldMap;

/// Only UTF-8 uploads are accepted; the declared encoding is fixed.
pub const UPLOAD_ENCODING: &str = "utf-8";

// =============================================================================
// Upload State
// =============================================================================

/// Lifecycle state of an upload job.
///
/// `PENDING → PROCESSING → {COMPLETED, ERROR}`, plus the user-cancel path
/// `PENDING → REJECTED`. COMPLETED, ERROR and REJECTED are terminal; there
/// is no retry transition, so a fresh job must be created instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadState {
    Pending,
    Processing,
    Completed,
    Error,
    Rejected,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Rejected)
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Row Ledger
// =============================================================================

/// Outcome status of one processed row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowStatus {
    Ok,
    Error,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }
}

/// Append-only outcome record for one input row.
///
/// The raw field map is kept verbatim so a user can see exactly what was
/// submitted, correct it, and resubmit in a new job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadRowResult {
    /// 1-based physical row number; the header is row 1.
    pub row_number: usize,
    pub status: RowStatus,
    /// Empty for OK rows.
    pub message: String,
    /// Raw submitted values, header-keyed.
    pub fields: FieldMap,
}

impl UploadRowResult {
    pub fn ok(row_number: usize, fields: FieldMap) -> Self {
        Self {
            row_number,
            status: RowStatus::Ok,
            message: String::new(),
            fields,
        }
    }

    pub fn error(row_number: usize, message: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            row_number,
            status: RowStatus::Error,
            message: message.into(),
            fields,
        }
    }
}

// =============================================================================
// Upload Job
// =============================================================================

/// The orchestrated unit of a bulk upload.
///
/// Mutated only by the processor while PROCESSING; terminal jobs are
/// immutable audit records and are never deleted through normal flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    pub id: Uuid,
    /// Name of the uploaded source file.
    pub file_name: String,
    /// Declared encoding; always [`UPLOAD_ENCODING`].
    pub encoding: String,
    /// User who submitted the upload.
    pub created_by: String,
    pub state: UploadState,
    pub total_rows: usize,
    pub ok_count: usize,
    pub error_count: usize,
    /// Row number → message, ordered. Row 0 marks a whole-file failure.
    pub error_summary: BTreeMap<usize, String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl UploadJob {
    /// Create a job in PENDING state, ready for processing.
    pub fn new(file_name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            encoding: UPLOAD_ENCODING.to_string(),
            created_by: created_by.into(),
            state: UploadState::Pending,
            total_rows: 0,
            ok_count: 0,
            error_count: 0,
            error_summary: BTreeMap::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Success percentage, rounded to two decimals. 0 for an empty job.
    pub fn success_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        let rate = self.ok_count as f64 / self.total_rows as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }

    /// User-cancel path: only legal before processing starts.
    pub fn reject(&mut self) -> UploadResult<()> {
        if self.state != UploadState::Pending {
            return Err(UploadError::NotPending { state: self.state });
        }
        self.state = UploadState::Rejected;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = UploadJob::new("ratings.txt", "analyst");
        assert_eq!(job.state, UploadState::Pending);
        assert_eq!(job.encoding, "utf-8");
        assert_eq!(job.total_rows, 0);
        assert!(job.started_at.is_none());
    }

    #[test]
    fn test_success_rate_zero_rows() {
        let job = UploadJob::new("ratings.txt", "analyst");
        assert_eq!(job.success_rate(), 0.0);
    }

    #[test]
    fn test_success_rate_rounds_to_two_decimals() {
        let mut job = UploadJob::new("ratings.txt", "analyst");
        job.total_rows = 3;
        job.ok_count = 2;
        job.error_count = 1;
        // 2/3 = 66.666..% -> 66.67
        assert_eq!(job.success_rate(), 66.67);
    }

    #[test]
    fn test_success_rate_full() {
        let mut job = UploadJob::new("ratings.txt", "analyst");
        job.total_rows = 4;
        job.ok_count = 4;
        assert_eq!(job.success_rate(), 100.0);
    }

    #[test]
    fn test_reject_from_pending() {
        let mut job = UploadJob::new("ratings.txt", "analyst");
        job.reject().unwrap();
        assert_eq!(job.state, UploadState::Rejected);
        assert!(job.state.is_terminal());
        assert_eq!(job.ok_count, 0);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_reject_after_terminal_fails() {
        let mut job = UploadJob::new("ratings.txt", "analyst");
        job.state = UploadState::Completed;
        let err = job.reject().unwrap_err();
        assert!(matches!(
            err,
            UploadError::NotPending { state: UploadState::Completed }
        ));
        assert_eq!(job.state, UploadState::Completed);
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(UploadState::Pending.as_str(), "PENDING");
        assert!(!UploadState::Processing.is_terminal());
        assert!(UploadState::Error.is_terminal());
        assert_eq!(
            serde_json::to_string(&UploadState::Completed).unwrap(),
            "\"COMPLETED\""
        );
    }

    #[test]
    fn test_row_result_constructors() {
        let result = UploadRowResult::ok(2, FieldMap::new());
        assert_eq!(result.status, RowStatus::Ok);
        assert!(result.message.is_empty());

        let result = UploadRowResult::error(3, "bad row", FieldMap::new());
        assert_eq!(result.status, RowStatus::Error);
        assert_eq!(result.message, "bad row");
    }
}
