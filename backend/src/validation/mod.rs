//! Row validation for bulk uploads.
//!
//! Checks one raw field map against the referential and business rules,
//! accumulating every triggered message in rule order. Data-quality problems
//! are never errors in the `Result` sense: the validator always returns, and
//! the orchestrator decides what to do with the messages.
//!
//! Rule order (short-circuiting on the required-field check only):
//! 1. `issuer_code`, `instrument_code`, `rating`, `valid_from` present
//! 2. issuer exists in reference data
//! 3. instrument exists in reference data
//! 4. `rating` is a known grade
//! 5. `valid_from` is an ISO date
//! 6. `valid_to`, when given, is an ISO date strictly after `valid_from`
//! 7. `status`, when given, is a known status
//! 8. `risk_level`, when given, is a known risk level

use chrono::NaiveDate;

use crate::models::{RatingGrade, RatingStatus, RiskLevel};
use crate::parser::FieldMap;
use crate::store::ReferenceData;

/// Fields that must be present and non-empty on every row.
pub const REQUIRED_FIELDS: [&str; 4] = ["issuer_code", "instrument_code", "rating", "valid_from"];

/// Date format accepted for `valid_from` / `valid_to`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome of validating a single row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowValidation {
    /// Triggered rule messages, in rule order. Empty means valid.
    pub errors: Vec<String>,
}

impl RowValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The ledger message: all errors joined with `"; "`.
    pub fn message(&self) -> String {
        self.errors.join("; ")
    }
}

fn field<'a>(fields: &'a FieldMap, name: &str) -> &'a str {
    fields.get(name).map(|v| v.trim()).unwrap_or("")
}

/// Parse an ISO calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Validate one raw row against a reference-data snapshot.
///
/// Pure given fixed reference data: validating the same row twice yields
/// identical results.
pub fn validate_row(fields: &FieldMap, refs: &dyn ReferenceData) -> RowValidation {
    let mut errors = Vec::new();

    // Rule 1: required fields. Everything downstream assumes these exist,
    // so a miss returns immediately.
    for name in REQUIRED_FIELDS {
        if field(fields, name).is_empty() {
            errors.push(format!("Required field '{}' is missing or empty", name));
        }
    }
    if !errors.is_empty() {
        return RowValidation { errors };
    }

    // Rule 2: issuer existence.
    let issuer_code = field(fields, "issuer_code");
    if refs.find_issuer(issuer_code).is_none() {
        errors.push(format!("Issuer with code '{}' does not exist", issuer_code));
    }

    // Rule 3: instrument existence.
    let instrument_code = field(fields, "instrument_code");
    if refs.find_instrument(instrument_code).is_none() {
        errors.push(format!(
            "Instrument with code '{}' does not exist",
            instrument_code
        ));
    }

    // Rule 4: rating grade.
    let rating = field(fields, "rating");
    if RatingGrade::from_code(rating).is_none() {
        errors.push(format!(
            "Rating '{}' is not valid. Options: {}",
            rating,
            RatingGrade::CODES.join(", ")
        ));
    }

    // Rule 5: valid_from date.
    let valid_from_raw = field(fields, "valid_from");
    let valid_from = parse_date(valid_from_raw);
    if valid_from.is_none() {
        errors.push(format!(
            "valid_from '{}' is not a valid date. Use YYYY-MM-DD",
            valid_from_raw
        ));
    }

    // Rule 6: valid_to date and ordering. The ordering half needs both
    // dates parsed; a malformed valid_from already produced its own error.
    let valid_to_raw = field(fields, "valid_to");
    if !valid_to_raw.is_empty() {
        match parse_date(valid_to_raw) {
            None => errors.push(format!(
                "valid_to '{}' is not a valid date. Use YYYY-MM-DD",
                valid_to_raw
            )),
            Some(valid_to) => {
                if let Some(valid_from) = valid_from {
                    if valid_to <= valid_from {
                        errors.push(format!(
                            "valid_to '{}' must be strictly after valid_from '{}'",
                            valid_to_raw, valid_from_raw
                        ));
                    }
                }
            }
        }
    }

    // Rule 7: status.
    let status = field(fields, "status");
    if !status.is_empty() && RatingStatus::from_code(status).is_none() {
        errors.push(format!(
            "Status '{}' is not valid. Options: {}",
            status,
            RatingStatus::CODES.join(", ")
        ));
    }

    // Rule 8: risk level.
    let risk_level = field(fields, "risk_level");
    if !risk_level.is_empty() && RiskLevel::from_code(risk_level).is_none() {
        errors.push(format!(
            "Risk level '{}' is not valid. Options: {}",
            risk_level,
            RiskLevel::CODES.join(", ")
        ));
    }

    RowValidation { errors }
}
