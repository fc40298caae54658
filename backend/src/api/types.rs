//! REST API types for the upload surface.
//!
//! Serialized camelCase for frontend consumption. Rating CRUD stays out of
//! this service; the API only exposes the upload lifecycle and its ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::upload::{RowStatus, UploadJob, UploadRowResult, UploadState};

/// Response after a file passes the acceptance gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub job_id: Uuid,
    pub file_name: String,
    pub state: UploadState,
}

/// Full job view, including the derived success rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub job_id: Uuid,
    pub file_name: String,
    pub encoding: String,
    pub created_by: String,
    pub state: UploadState,
    pub total_rows: usize,
    pub ok_count: usize,
    pub error_count: usize,
    /// Percentage, two decimals.
    pub success_rate: f64,
    /// Row number → message. Row 0 marks a whole-file failure.
    pub error_summary: BTreeMap<usize, String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&UploadJob> for JobView {
    fn from(job: &UploadJob) -> Self {
        Self {
            job_id: job.id,
            file_name: job.file_name.clone(),
            encoding: job.encoding.clone(),
            created_by: job.created_by.clone(),
            state: job.state,
            total_rows: job.total_rows,
            ok_count: job.ok_count,
            error_count: job.error_count,
            success_rate: job.success_rate(),
            error_summary: job.error_summary.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}

/// One row of the result ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowItemView {
    pub row_number: usize,
    pub status: RowStatus,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl From<&UploadRowResult> for RowItemView {
    fn from(row: &UploadRowResult) -> Self {
        Self {
            row_number: row.row_number,
            status: row.status,
            message: row.message.clone(),
            fields: row.fields.clone(),
        }
    }
}

/// Aggregate counters across all known uploads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStats {
    pub total_uploads: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub rejected: usize,
    pub rows_ok: usize,
    pub rows_error: usize,
}

impl UploadStats {
    pub fn add(&mut self, job: &UploadJob) {
        self.total_uploads += 1;
        match job.state {
            UploadState::Pending => self.pending += 1,
            UploadState::Processing => self.processing += 1,
            UploadState::Completed => self.completed += 1,
            UploadState::Error => self.failed += 1,
            UploadState::Rejected => self.rejected += 1,
        }
        self.rows_ok += job.ok_count;
        self.rows_error += job.error_count;
    }
}

/// Create an error response body.
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_view_carries_success_rate() {
        let mut job = UploadJob::new("ratings.txt", "analyst");
        job.state = UploadState::Completed;
        job.total_rows = 3;
        job.ok_count = 2;
        job.error_count = 1;
        job.error_summary.insert(3, "bad row".into());

        let view = JobView::from(&job);
        assert_eq!(view.success_rate, 66.67);
        assert_eq!(view.error_summary[&3], "bad row");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["state"], "COMPLETED");
        assert_eq!(json["okCount"], 2);
        // Integer-keyed map serializes with string keys.
        assert_eq!(json["errorSummary"]["3"], "bad row");
    }

    #[test]
    fn test_stats_accumulation() {
        let mut stats = UploadStats::default();

        let mut completed = UploadJob::new("a.txt", "u");
        completed.state = UploadState::Completed;
        completed.ok_count = 5;
        completed.error_count = 2;
        stats.add(&completed);

        let mut rejected = UploadJob::new("b.txt", "u");
        rejected.state = UploadState::Rejected;
        stats.add(&rejected);

        assert_eq!(stats.total_uploads, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.rows_ok, 5);
        assert_eq!(stats.rows_error, 2);
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("No file provided");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "No file provided");
    }
}
