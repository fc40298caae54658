//! Reference-data and rating record store collaborators.
//!
//! The pipeline core only ever talks to these traits; the interactive CRUD
//! surface that fills them in production is out of scope here. The in-memory
//! implementations back the CLI, the HTTP server and the tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::models::{Instrument, Issuer, RatingDraft, RatingRecord, RatingStatus};

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Lookup of issuers and instruments by short code.
pub trait ReferenceData: Send + Sync {
    fn find_issuer(&self, code: &str) -> Option<Issuer>;
    fn find_instrument(&self, code: &str) -> Option<Instrument>;
}

/// Creation-only store for rating records.
///
/// The bulk pipeline never updates or deletes; constraint violations
/// (including the ACTIVE-window overlap rule) surface as [`StoreError`].
pub trait RatingStore: Send + Sync {
    fn create_rating(&self, draft: RatingDraft) -> StoreResult<RatingRecord>;

    /// Snapshot of all stored records, creation order.
    fn ratings(&self) -> Vec<RatingRecord>;
}

// =============================================================================
// In-Memory Reference Data
// =============================================================================

/// Code-keyed reference data held in memory.
#[derive(Debug, Default)]
pub struct InMemoryReferenceData {
    issuers: HashMap<String, Issuer>,
    instruments: HashMap<String, Instrument>,
}

impl InMemoryReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issuer(&mut self, code: &str, name: &str) {
        self.issuers.insert(
            code.to_string(),
            Issuer { code: code.to_string(), name: name.to_string() },
        );
    }

    pub fn add_instrument(&mut self, code: &str, name: &str) {
        self.instruments.insert(
            code.to_string(),
            Instrument { code: code.to_string(), name: name.to_string() },
        );
    }

    /// Load reference data from a seed file.
    ///
    /// One entry per line, `kind|code|name` with kind `issuer` or
    /// `instrument`; blank lines and `#` comments are ignored.
    pub fn from_seed_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read seed file: {}", e))?;

        let mut refs = Self::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split('|').map(|p| p.trim()).collect();
            if parts.len() != 3 {
                return Err(format!(
                    "Seed line {}: expected 'kind|code|name', got '{}'",
                    idx + 1,
                    line
                ));
            }

            match parts[0].to_lowercase().as_str() {
                "issuer" => refs.add_issuer(parts[1], parts[2]),
                "instrument" => refs.add_instrument(parts[1], parts[2]),
                other => {
                    return Err(format!(
                        "Seed line {}: unknown kind '{}' (use issuer or instrument)",
                        idx + 1,
                        other
                    ))
                }
            }
        }

        Ok(refs)
    }

    pub fn issuer_count(&self) -> usize {
        self.issuers.len()
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }
}

impl ReferenceData for InMemoryReferenceData {
    fn find_issuer(&self, code: &str) -> Option<Issuer> {
        self.issuers.get(code.trim()).cloned()
    }

    fn find_instrument(&self, code: &str) -> Option<Instrument> {
        self.instruments.get(code.trim()).cloned()
    }
}

// =============================================================================
// In-Memory Rating Store
// =============================================================================

/// Rating store backed by a mutex-guarded vector.
///
/// Creations are serialized by the lock, so concurrent jobs racing on the
/// same (issuer, instrument) pair resolve into a row-level overlap error
/// rather than a silent duplicate.
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    records: Mutex<Vec<RatingRecord>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Half-open windows `[from, to)`; a missing end extends to infinity.
fn windows_overlap(
    from_a: chrono::NaiveDate,
    to_a: Option<chrono::NaiveDate>,
    from_b: chrono::NaiveDate,
    to_b: Option<chrono::NaiveDate>,
) -> bool {
    let a_starts_before_b_ends = match to_b {
        Some(end) => from_a < end,
        None => true,
    };
    let b_starts_before_a_ends = match to_a {
        Some(end) => from_b < end,
        None => true,
    };
    a_starts_before_b_ends && b_starts_before_a_ends
}

impl RatingStore for InMemoryRatingStore {
    fn create_rating(&self, draft: RatingDraft) -> StoreResult<RatingRecord> {
        if let Some(valid_to) = draft.valid_to {
            if valid_to <= draft.valid_from {
                return Err(StoreError::InvalidWindow {
                    valid_from: draft.valid_from,
                    valid_to,
                });
            }
        }

        let mut records = self
            .records
            .lock()
            .expect("rating store mutex poisoned");

        // Overlap-uniqueness: only ACTIVE windows for the same pair conflict.
        if draft.status == RatingStatus::Active {
            let conflict = records.iter().find(|existing| {
                existing.status == RatingStatus::Active
                    && existing.issuer_code == draft.issuer_code
                    && existing.instrument_code == draft.instrument_code
                    && windows_overlap(
                        existing.valid_from,
                        existing.valid_to,
                        draft.valid_from,
                        draft.valid_to,
                    )
            });

            if let Some(existing) = conflict {
                return Err(StoreError::OverlapConflict {
                    issuer: draft.issuer_code.clone(),
                    instrument: draft.instrument_code.clone(),
                    existing_from: existing.valid_from,
                    existing_to: existing
                        .valid_to
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "open".into()),
                });
            }
        }

        let record = RatingRecord::from_draft(draft);
        records.push(record.clone());
        Ok(record)
    }

    fn ratings(&self) -> Vec<RatingRecord> {
        self.records
            .lock()
            .expect("rating store mutex poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RatingGrade, RiskLevel};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(from: NaiveDate, to: Option<NaiveDate>, status: RatingStatus) -> RatingDraft {
        RatingDraft {
            issuer_code: "ABC".into(),
            instrument_code: "BOND1".into(),
            grade: RatingGrade::Aaa,
            valid_from: from,
            valid_to: to,
            status,
            risk_level: RiskLevel::Moderate,
            comments: String::new(),
            created_by: "analyst".into(),
        }
    }

    #[test]
    fn test_open_window_blocks_later_start() {
        let store = InMemoryRatingStore::new();
        store
            .create_rating(draft(date(2024, 1, 1), None, RatingStatus::Active))
            .unwrap();

        let err = store
            .create_rating(draft(date(2024, 6, 1), None, RatingStatus::Active))
            .unwrap_err();
        match err {
            StoreError::OverlapConflict { existing_to, .. } => assert_eq!(existing_to, "open"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_adjacent_windows_do_not_overlap() {
        // Half-open: a window ending 2024-06-01 and one starting there touch
        // but do not overlap.
        let store = InMemoryRatingStore::new();
        store
            .create_rating(draft(date(2024, 1, 1), Some(date(2024, 6, 1)), RatingStatus::Active))
            .unwrap();
        store
            .create_rating(draft(date(2024, 6, 1), None, RatingStatus::Active))
            .unwrap();

        assert_eq!(store.ratings().len(), 2);
    }

    #[test]
    fn test_non_active_records_never_conflict() {
        let store = InMemoryRatingStore::new();
        store
            .create_rating(draft(date(2024, 1, 1), None, RatingStatus::Active))
            .unwrap();
        store
            .create_rating(draft(date(2024, 3, 1), None, RatingStatus::Expired))
            .unwrap();

        assert_eq!(store.ratings().len(), 2);
    }

    #[test]
    fn test_other_pair_does_not_conflict() {
        let store = InMemoryRatingStore::new();
        store
            .create_rating(draft(date(2024, 1, 1), None, RatingStatus::Active))
            .unwrap();

        let mut other = draft(date(2024, 1, 1), None, RatingStatus::Active);
        other.instrument_code = "NOTE2".into();
        store.create_rating(other).unwrap();

        assert_eq!(store.ratings().len(), 2);
    }

    #[test]
    fn test_empty_window_rejected() {
        let store = InMemoryRatingStore::new();
        let err = store
            .create_rating(draft(date(2024, 6, 1), Some(date(2024, 6, 1)), RatingStatus::Active))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidWindow { .. }));
    }

    #[test]
    fn test_seed_file_loading() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# reference data").unwrap();
        writeln!(file, "issuer|ABC|ABC Corp").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "instrument|BOND1|Corporate Bond").unwrap();

        let refs = InMemoryReferenceData::from_seed_file(&path).unwrap();
        assert_eq!(refs.issuer_count(), 1);
        assert_eq!(refs.instrument_count(), 1);
        assert_eq!(refs.find_issuer("ABC").unwrap().name, "ABC Corp");
        assert!(refs.find_instrument("MISSING").is_none());
    }

    #[test]
    fn test_seed_file_bad_kind() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "bank|ABC|ABC Corp").unwrap();

        let err = InMemoryReferenceData::from_seed_file(&path).unwrap_err();
        assert!(err.contains("unknown kind"));
    }
}
