//! The upload orchestrator.
//!
//! Drives a job through its lifecycle: PENDING gate, parse, then a fold over
//! the rows where each row is validated, normalized and written
//! independently. Row-level failures never abort the batch; only a
//! whole-file parse failure ends the job in ERROR before any row is touched,
//! and already-created records are never rolled back.

use chrono::Utc;

use crate::api::logs::{log_error_for, log_info_for, log_success_for};
use crate::audit;
use crate::error::{StoreError, UploadError, UploadResult};
use crate::models::{RatingDraft, RatingGrade, RatingStatus, RiskLevel};
use crate::parser::{parse_bytes, FieldMap, ParsedRow};
use crate::store::{RatingStore, ReferenceData};
use crate::upload::job::{RowStatus, UploadJob, UploadRowResult, UploadState};
use crate::validation::{parse_date, validate_row};

/// Process a pending upload against its file bytes.
///
/// Returns the per-row ledger in ascending row order. The only `Err` is the
/// operational one: calling this on a job that already left PENDING. A parse
/// failure is not an `Err` here; it ends the job in ERROR state with a
/// whole-file summary entry and an empty ledger.
pub fn process_upload(
    job: &mut UploadJob,
    bytes: &[u8],
    refs: &dyn ReferenceData,
    store: &dyn RatingStore,
) -> UploadResult<Vec<UploadRowResult>> {
    if job.state != UploadState::Pending {
        return Err(UploadError::AlreadyProcessed { state: job.state });
    }

    job.state = UploadState::Processing;
    job.started_at = Some(Utc::now());
    log_info_for(job.id, format!("Processing upload '{}'", job.file_name));

    let outcome = match parse_bytes(bytes) {
        Ok(outcome) => outcome,
        Err(e) => {
            // File-level fatal: no per-row results exist for this job.
            let message = e.to_string();
            job.state = UploadState::Error;
            job.error_summary.insert(0, message.clone());
            job.finished_at = Some(Utc::now());
            log_error_for(job.id, message.clone());
            audit::record_failed(job, &message);
            return Ok(Vec::new());
        }
    };

    job.total_rows = outcome.rows.len();
    log_info_for(
        job.id,
        format!(
            "Parsed {} data rows (delimiter {})",
            outcome.rows.len(),
            display_delimiter(outcome.delimiter)
        ),
    );

    // Strict ascending row order: later rows must see earlier commits of
    // this same run in the overlap check.
    let results: Vec<UploadRowResult> = outcome
        .rows
        .iter()
        .map(|row| process_row(row, &job.created_by, refs, store))
        .collect();

    for result in &results {
        match result.status {
            RowStatus::Ok => job.ok_count += 1,
            RowStatus::Error => {
                job.error_count += 1;
                job.error_summary
                    .insert(result.row_number, result.message.clone());
            }
        }
    }

    job.state = UploadState::Completed;
    job.finished_at = Some(Utc::now());
    log_success_for(
        job.id,
        format!(
            "Completed: {} rows, {} OK, {} errors ({}%)",
            job.total_rows,
            job.ok_count,
            job.error_count,
            job.success_rate()
        ),
    );
    audit::record_completed(job);

    Ok(results)
}

/// One step of the per-row fold. Always returns an outcome, never fails.
fn process_row(
    row: &ParsedRow,
    created_by: &str,
    refs: &dyn ReferenceData,
    store: &dyn RatingStore,
) -> UploadRowResult {
    let validation = validate_row(&row.fields, refs);
    if !validation.is_valid() {
        return UploadRowResult::error(row.number, validation.message(), row.fields.clone());
    }

    // Resolve references, normalize, create. Any failure here (including
    // the overlap constraint) becomes this row's ERROR outcome.
    let created = build_draft(&row.fields, created_by).and_then(|draft| {
        refs.find_issuer(&draft.issuer_code)
            .ok_or_else(|| StoreError::UnknownIssuer(draft.issuer_code.clone()).to_string())?;
        refs.find_instrument(&draft.instrument_code)
            .ok_or_else(|| StoreError::UnknownInstrument(draft.instrument_code.clone()).to_string())?;
        store.create_rating(draft).map_err(|e| e.to_string())
    });

    match created {
        Ok(_) => UploadRowResult::ok(row.number, row.fields.clone()),
        Err(message) => UploadRowResult::error(row.number, message, row.fields.clone()),
    }
}

/// Build the typed draft from a validated field map.
///
/// Optional fields take their defaults: blank `valid_to` is absent, blank
/// `status` is ACTIVE, blank `risk_level` is MODERATE, blank `comments` is
/// the empty string.
fn build_draft(fields: &FieldMap, created_by: &str) -> Result<RatingDraft, String> {
    let value = |name: &str| fields.get(name).map(|v| v.trim()).unwrap_or("");

    let rating = value("rating");
    let grade = RatingGrade::from_code(rating)
        .ok_or_else(|| format!("Rating '{}' is not valid", rating))?;

    let valid_from_raw = value("valid_from");
    let valid_from = parse_date(valid_from_raw)
        .ok_or_else(|| format!("valid_from '{}' is not a valid date", valid_from_raw))?;

    let valid_to_raw = value("valid_to");
    let valid_to = if valid_to_raw.is_empty() {
        None
    } else {
        Some(
            parse_date(valid_to_raw)
                .ok_or_else(|| format!("valid_to '{}' is not a valid date", valid_to_raw))?,
        )
    };

    let status_raw = value("status");
    let status = if status_raw.is_empty() {
        RatingStatus::default()
    } else {
        RatingStatus::from_code(status_raw)
            .ok_or_else(|| format!("Status '{}' is not valid", status_raw))?
    };

    let risk_raw = value("risk_level");
    let risk_level = if risk_raw.is_empty() {
        RiskLevel::default()
    } else {
        RiskLevel::from_code(risk_raw)
            .ok_or_else(|| format!("Risk level '{}' is not valid", risk_raw))?
    };

    Ok(RatingDraft {
        issuer_code: value("issuer_code").to_string(),
        instrument_code: value("instrument_code").to_string(),
        grade,
        valid_from,
        valid_to,
        status,
        risk_level,
        comments: value("comments").to_string(),
        created_by: created_by.to_string(),
    })
}

fn display_delimiter(d: char) -> &'static str {
    match d {
        '\t' => "TAB",
        '|' => "'|'",
        _ => "?",
    }
}
