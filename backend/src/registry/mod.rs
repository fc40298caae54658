//! Upload archive - persistent record of terminal upload jobs.
//!
//! Saves each job together with its row ledger as one JSON file on disk and
//! reloads them on construction, so completed uploads survive a restart and
//! stay inspectable as immutable audit records.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::upload::{UploadJob, UploadRowResult};

/// Directory where uploads are stored (relative to current dir) unless
/// `RATELOAD_DATA_DIR` overrides it.
const DEFAULT_ARCHIVE_DIR: &str = ".rateload/uploads";

/// A job plus its row ledger, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUpload {
    pub job: UploadJob,
    pub rows: Vec<UploadRowResult>,
}

/// Archive for terminal upload jobs.
pub struct UploadArchive {
    /// Directory where upload files are stored
    archive_dir: PathBuf,
    /// Loaded uploads (job id -> stored upload)
    uploads: HashMap<Uuid, StoredUpload>,
}

impl UploadArchive {
    /// Create an archive in the default (or env-configured) directory,
    /// loading any existing uploads from disk.
    pub fn new() -> Self {
        let dir = std::env::var("RATELOAD_DATA_DIR")
            .unwrap_or_else(|_| DEFAULT_ARCHIVE_DIR.to_string());
        Self::with_dir(dir)
    }

    /// Create an archive with a custom directory.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let archive_dir = PathBuf::from(dir.as_ref());
        let mut archive = Self {
            archive_dir,
            uploads: HashMap::new(),
        };
        archive.load_all();
        archive
    }

    /// Load all uploads from the archive directory.
    fn load_all(&mut self) {
        if !self.archive_dir.exists() {
            return;
        }

        let entries = match fs::read_dir(&self.archive_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(stored) = serde_json::from_str::<StoredUpload>(&content) {
                        self.uploads.insert(stored.job.id, stored);
                    }
                }
            }
        }
    }

    /// Persist a terminal job and its ledger.
    pub fn save(
        &mut self,
        job: UploadJob,
        rows: Vec<UploadRowResult>,
    ) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.archive_dir)?;

        let stored = StoredUpload { job, rows };
        let path = self.archive_dir.join(format!("{}.json", stored.job.id));
        let content = serde_json::to_string_pretty(&stored)?;
        fs::write(&path, content)?;

        self.uploads.insert(stored.job.id, stored);
        Ok(())
    }

    /// Get one stored upload by job id.
    pub fn get(&self, id: Uuid) -> Option<&StoredUpload> {
        self.uploads.get(&id)
    }

    /// All stored uploads, newest first.
    pub fn list(&self) -> Vec<&StoredUpload> {
        let mut uploads: Vec<&StoredUpload> = self.uploads.values().collect();
        uploads.sort_by(|a, b| b.job.created_at.cmp(&a.job.created_at));
        uploads
    }

    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }
}

impl Default for UploadArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadState;
    use tempfile::tempdir;

    fn completed_job(file_name: &str) -> UploadJob {
        let mut job = UploadJob::new(file_name, "analyst");
        job.state = UploadState::Completed;
        job.total_rows = 1;
        job.ok_count = 1;
        job
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let job = completed_job("ratings.txt");
        let id = job.id;

        let mut archive = UploadArchive::with_dir(dir.path());
        archive.save(job, vec![]).unwrap();

        // A fresh archive over the same directory sees the upload.
        let reloaded = UploadArchive::with_dir(dir.path());
        assert_eq!(reloaded.len(), 1);
        let stored = reloaded.get(id).unwrap();
        assert_eq!(stored.job.file_name, "ratings.txt");
        assert_eq!(stored.job.state, UploadState::Completed);
        assert_eq!(stored.job.ok_count, 1);
    }

    #[test]
    fn test_ledger_round_trips() {
        use crate::parser::FieldMap;

        let dir = tempdir().unwrap();
        let job = completed_job("ratings.txt");
        let id = job.id;

        let mut fields = FieldMap::new();
        fields.insert("rating".into(), "ZZZ".into());
        let rows = vec![UploadRowResult::error(2, "Rating 'ZZZ' is not valid", fields)];

        let mut archive = UploadArchive::with_dir(dir.path());
        archive.save(job, rows).unwrap();

        let reloaded = UploadArchive::with_dir(dir.path());
        let stored = reloaded.get(id).unwrap();
        assert_eq!(stored.rows.len(), 1);
        assert_eq!(stored.rows[0].row_number, 2);
        assert_eq!(stored.rows[0].fields["rating"], "ZZZ");
    }

    #[test]
    fn test_list_is_newest_first() {
        let dir = tempdir().unwrap();
        let mut archive = UploadArchive::with_dir(dir.path());

        let older = completed_job("first.txt");
        let mut newer = completed_job("second.txt");
        newer.created_at = older.created_at + chrono::Duration::seconds(5);

        archive.save(older, vec![]).unwrap();
        archive.save(newer, vec![]).unwrap();

        let listed = archive.list();
        assert_eq!(listed[0].job.file_name, "second.txt");
        assert_eq!(listed[1].job.file_name, "first.txt");
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let archive = UploadArchive::with_dir(dir.path().join("nope"));
        assert!(archive.is_empty());
    }
}
