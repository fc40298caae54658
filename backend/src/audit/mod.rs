//! Structured audit events for the upload lifecycle.
//!
//! Every job creation, completion, failure and rejection is recorded with
//! the job id, final counts and a human-readable description. Events are
//! kept in an in-memory trail and narrated through the log broadcaster;
//! a production deployment would forward them to its audit-log sink.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::logs::log_info_for;
use crate::upload::UploadJob;

/// What happened to the job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Created,
    Completed,
    Failed,
    Rejected,
}

/// One audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub job_id: Uuid,
    pub action: AuditAction,
    pub description: String,
    pub total_rows: usize,
    pub ok_count: usize,
    pub error_count: usize,
    pub at: DateTime<Utc>,
}

/// Global audit trail.
pub static AUDIT_TRAIL: Lazy<AuditTrail> = Lazy::new(AuditTrail::new);

/// Append-only in-memory audit trail.
pub struct AuditTrail {
    events: Mutex<Vec<AuditEvent>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self { events: Mutex::new(Vec::new()) }
    }

    /// Record an event and narrate it to log subscribers.
    pub fn record(&self, event: AuditEvent) {
        log_info_for(event.job_id, event.description.clone());
        self.events
            .lock()
            .expect("audit trail mutex poisoned")
            .push(event);
    }

    /// Events for one job, oldest first.
    pub fn for_job(&self, job_id: Uuid) -> Vec<AuditEvent> {
        self.events
            .lock()
            .expect("audit trail mutex poisoned")
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

fn event_for(job: &UploadJob, action: AuditAction, description: String) -> AuditEvent {
    AuditEvent {
        job_id: job.id,
        action,
        description,
        total_rows: job.total_rows,
        ok_count: job.ok_count,
        error_count: job.error_count,
        at: Utc::now(),
    }
}

pub fn record_created(job: &UploadJob) {
    AUDIT_TRAIL.record(event_for(
        job,
        AuditAction::Created,
        format!("Upload '{}' created by {}", job.file_name, job.created_by),
    ));
}

pub fn record_completed(job: &UploadJob) {
    AUDIT_TRAIL.record(event_for(
        job,
        AuditAction::Completed,
        format!(
            "Upload '{}' completed: {} rows, {} OK, {} errors",
            job.file_name, job.total_rows, job.ok_count, job.error_count
        ),
    ));
}

pub fn record_failed(job: &UploadJob, reason: &str) {
    AUDIT_TRAIL.record(event_for(
        job,
        AuditAction::Failed,
        format!("Upload '{}' failed: {}", job.file_name, reason),
    ));
}

pub fn record_rejected(job: &UploadJob) {
    AUDIT_TRAIL.record(event_for(
        job,
        AuditAction::Rejected,
        format!("Upload '{}' rejected before processing", job.file_name),
    ));
}
