//! Domain models for the rateload pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`RatingGrade`] - ordinal credit-quality grades (AAA..D)
//! - [`RatingStatus`] - lifecycle status of a rating record
//! - [`RiskLevel`] - coarse risk classification
//! - [`Issuer`] / [`Instrument`] - reference-data entities resolved by code
//! - [`RatingDraft`] - typed, normalized row ready for the record store
//! - [`RatingRecord`] - the persisted rating produced on success

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Rating Grade
// =============================================================================

/// Ordinal credit-quality grade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RatingGrade {
    Aaa,
    Aa,
    A,
    Bbb,
    Bb,
    B,
    Ccc,
    Cc,
    C,
    D,
}

impl RatingGrade {
    /// Accepted grade codes, best to worst.
    pub const CODES: [&'static str; 10] =
        ["AAA", "AA", "A", "BBB", "BB", "B", "CCC", "CC", "C", "D"];

    /// Parse a grade from its code. Case-insensitive, surrounding
    /// whitespace ignored.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "AAA" => Some(Self::Aaa),
            "AA" => Some(Self::Aa),
            "A" => Some(Self::A),
            "BBB" => Some(Self::Bbb),
            "BB" => Some(Self::Bb),
            "B" => Some(Self::B),
            "CCC" => Some(Self::Ccc),
            "CC" => Some(Self::Cc),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }

    /// Canonical grade code.
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Aaa => "AAA",
            Self::Aa => "AA",
            Self::A => "A",
            Self::Bbb => "BBB",
            Self::Bb => "BB",
            Self::B => "B",
            Self::Ccc => "CCC",
            Self::Cc => "CC",
            Self::C => "C",
            Self::D => "D",
        }
    }

    /// Human-readable risk description shown in reports.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Aaa => "Very low risk",
            Self::Aa => "Low risk",
            Self::A => "Low to moderate risk",
            Self::Bbb => "Moderate risk",
            Self::Bb => "Moderate to high risk",
            Self::B => "High risk",
            Self::Ccc | Self::Cc | Self::C => "Very high risk",
            Self::D => "In default",
        }
    }
}

impl std::fmt::Display for RatingGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

// =============================================================================
// Rating Status
// =============================================================================

/// Lifecycle status of a rating record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RatingStatus {
    /// In force. Only ACTIVE records participate in the overlap constraint.
    #[default]
    Active,
    Expired,
    Suspended,
    Cancelled,
}

impl RatingStatus {
    /// Accepted status codes.
    pub const CODES: [&'static str; 4] = ["ACTIVE", "EXPIRED", "SUSPENDED", "CANCELLED"];

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "EXPIRED" => Some(Self::Expired),
            "SUSPENDED" => Some(Self::Suspended),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Expired => "EXPIRED",
            Self::Suspended => "SUSPENDED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for RatingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

// =============================================================================
// Risk Level
// =============================================================================

/// Coarse risk classification attached to a rating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    VeryLow,
    Low,
    #[default]
    Moderate,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Accepted risk-level codes.
    pub const CODES: [&'static str; 5] = ["VERY_LOW", "LOW", "MODERATE", "HIGH", "VERY_HIGH"];

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "VERY_LOW" => Some(Self::VeryLow),
            "LOW" => Some(Self::Low),
            "MODERATE" => Some(Self::Moderate),
            "HIGH" => Some(Self::High),
            "VERY_HIGH" => Some(Self::VeryHigh),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::VeryLow => "VERY_LOW",
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

// =============================================================================
// Reference Data Entities
// =============================================================================

/// An entity (company, bank) that issues financial instruments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issuer {
    /// Short code used in upload files.
    pub code: String,
    /// Legal name.
    pub name: String,
}

/// A specific financial product (bond, share, note) issued by an issuer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    /// Short code used in upload files.
    pub code: String,
    /// Display name.
    pub name: String,
}

// =============================================================================
// Rating Draft
// =============================================================================

/// A validated, normalized row ready to be written to the record store.
///
/// Built by the orchestrator after the row validator has passed: optional
/// fields carry their defaults (`status` ACTIVE, `risk_level` MODERATE), a
/// blank `valid_to` is absent rather than empty. The raw string map the draft
/// was built from is kept only on the row ledger for traceability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingDraft {
    pub issuer_code: String,
    pub instrument_code: String,
    pub grade: RatingGrade,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub status: RatingStatus,
    pub risk_level: RiskLevel,
    pub comments: String,
    /// User on whose behalf the record is created.
    pub created_by: String,
}

// =============================================================================
// Rating Record
// =============================================================================

/// A persisted tax rating, as produced by the record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingRecord {
    pub id: Uuid,
    pub issuer_code: String,
    pub instrument_code: String,
    pub grade: RatingGrade,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub status: RatingStatus,
    pub risk_level: RiskLevel,
    pub comments: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl RatingRecord {
    /// Materialize a draft as a stored record.
    pub fn from_draft(draft: RatingDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            issuer_code: draft.issuer_code,
            instrument_code: draft.instrument_code,
            grade: draft.grade,
            valid_from: draft.valid_from,
            valid_to: draft.valid_to,
            status: draft.status,
            risk_level: draft.risk_level,
            comments: draft.comments,
            created_by: draft.created_by,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_from_code() {
        assert_eq!(RatingGrade::from_code("AAA"), Some(RatingGrade::Aaa));
        assert_eq!(RatingGrade::from_code(" bbb "), Some(RatingGrade::Bbb));
        assert_eq!(RatingGrade::from_code("ZZZ"), None);
        assert_eq!(RatingGrade::from_code(""), None);
    }

    #[test]
    fn test_grade_roundtrip() {
        for code in RatingGrade::CODES {
            let grade = RatingGrade::from_code(code).unwrap();
            assert_eq!(grade.as_code(), code);
        }
    }

    #[test]
    fn test_status_default_is_active() {
        assert_eq!(RatingStatus::default(), RatingStatus::Active);
        assert_eq!(RatingStatus::from_code("suspended"), Some(RatingStatus::Suspended));
        assert_eq!(RatingStatus::from_code("DELETED"), None);
    }

    #[test]
    fn test_risk_level_default_is_moderate() {
        assert_eq!(RiskLevel::default(), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_code("VERY_HIGH"), Some(RiskLevel::VeryHigh));
        assert_eq!(RiskLevel::from_code("EXTREME"), None);
    }

    #[test]
    fn test_enum_serialization_uses_codes() {
        let json = serde_json::to_string(&RatingGrade::Bbb).unwrap();
        assert_eq!(json, "\"BBB\"");
        let json = serde_json::to_string(&RiskLevel::VeryLow).unwrap();
        assert_eq!(json, "\"VERY_LOW\"");
        let json = serde_json::to_string(&RatingStatus::Active).unwrap();
        assert_eq!(json, "\"ACTIVE\"");
    }

    #[test]
    fn test_record_from_draft_keeps_fields() {
        let draft = RatingDraft {
            issuer_code: "ABC".into(),
            instrument_code: "BOND1".into(),
            grade: RatingGrade::Aaa,
            valid_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            valid_to: None,
            status: RatingStatus::Active,
            risk_level: RiskLevel::Moderate,
            comments: String::new(),
            created_by: "analyst".into(),
        };
        let record = RatingRecord::from_draft(draft.clone());
        assert_eq!(record.issuer_code, draft.issuer_code);
        assert_eq!(record.grade, RatingGrade::Aaa);
        assert_eq!(record.valid_to, None);
    }
}
