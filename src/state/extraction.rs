//! In-memory extraction output with load-on-start resume.

use crate::error::ExtractError;
use crate::state::snapshot;
use crate::types::BatchRecord;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The accumulated extraction output plus its bookkeeping.
///
/// Indices are dense and monotonic: the next record always gets
/// `max(existing) + 1`, or 0 for an empty mapping. The processed set holds
/// exactly the `(cert_id, digest)` pairs for which a record exists, so
/// re-running over the same certificate stream never duplicates output.
pub struct ExtractionState {
    output_path: PathBuf,
    records: BTreeMap<u64, BatchRecord>,
    processed: HashSet<(String, String)>,
    next_index: u64,
}

impl ExtractionState {
    /// Load the existing output at `path`, or start empty.
    ///
    /// A missing file is a normal first run. A file that is unreadable, not
    /// a JSON object of records, or keyed by anything but decimal integers
    /// is ignored with a warning; the dense-index invariant cannot be
    /// guaranteed on top of it.
    pub fn load(path: &Path) -> Self {
        let records = match Self::read_records(path) {
            Some(records) => records,
            None => BTreeMap::new(),
        };

        let next_index = records.keys().next_back().map_or(0, |last| last + 1);

        let mut processed = HashSet::new();
        for record in records.values() {
            if let Some(cert_id) = &record.cert_id {
                processed.insert((cert_id.clone(), record.batch_digest.clone()));
            }
        }

        info!(
            "Loaded {} existing batches from {}; next_index={}",
            records.len(),
            path.display(),
            next_index
        );

        Self {
            output_path: path.to_owned(),
            records,
            processed,
            next_index,
        }
    }

    fn read_records(path: &Path) -> Option<BTreeMap<u64, BatchRecord>> {
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) => {
                warn!("Failed to read existing output at {}: {}", path.display(), error);
                return None;
            }
        };
        let raw: BTreeMap<String, BatchRecord> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    "Existing output at {} is not a record object ({}); ignoring",
                    path.display(),
                    error
                );
                return None;
            }
        };

        let mut records = BTreeMap::new();
        for (key, record) in raw {
            match key.parse::<u64>() {
                Ok(index) => {
                    records.insert(index, record);
                }
                Err(_) => {
                    warn!(
                        "Existing output at {} has non-numeric key {:?}; ignoring",
                        path.display(),
                        key
                    );
                    return None;
                }
            }
        }
        Some(records)
    }

    /// Whether a `(cert_id, digest)` pair already has a record.
    ///
    /// Records without a certificate id cannot be deduplicated and always
    /// report `false`.
    pub fn is_processed(&self, cert_id: Option<&str>, digest: &str) -> bool {
        match cert_id {
            Some(cert_id) => self
                .processed
                .contains(&(cert_id.to_owned(), digest.to_owned())),
            None => false,
        }
    }

    /// Append a record at the next free index and mark its pair processed.
    ///
    /// Returns the assigned index.
    pub fn commit(&mut self, record: BatchRecord) -> u64 {
        let index = self.next_index;
        if let Some(cert_id) = &record.cert_id {
            self.processed
                .insert((cert_id.clone(), record.batch_digest.clone()));
        }
        self.records.insert(index, record);
        self.next_index += 1;
        index
    }

    /// Atomically persist the full mapping to the output path.
    pub fn snapshot(&self) -> Result<(), ExtractError> {
        snapshot::write_snapshot(&self.output_path, &self.records)
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records have been extracted yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The index the next committed record will receive.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Where snapshots are written.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Read access to the records, in index order.
    pub fn records(&self) -> &BTreeMap<u64, BatchRecord> {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Certificate;
    use tempfile::TempDir;

    fn record(cert_id: &str, digest: &str) -> BatchRecord {
        let cert = Certificate {
            id: Some(cert_id.to_owned()),
            round: Some(1),
            author: Some("auth".to_owned()),
            ..Default::default()
        };
        BatchRecord::new(&cert, digest, vec!["0xaa".into()])
    }

    #[test]
    fn starts_empty_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let state = ExtractionState::load(&dir.path().join("out.json"));
        assert!(state.is_empty());
        assert_eq!(state.next_index(), 0);
    }

    #[test]
    fn commit_assigns_dense_indices_and_dedups() {
        let dir = TempDir::new().unwrap();
        let mut state = ExtractionState::load(&dir.path().join("out.json"));

        assert_eq!(state.commit(record("c1", "d1")), 0);
        assert_eq!(state.commit(record("c1", "d2")), 1);
        assert_eq!(state.commit(record("c2", "d1")), 2);
        assert_eq!(state.next_index(), 3);

        assert!(state.is_processed(Some("c1"), "d1"));
        assert!(state.is_processed(Some("c2"), "d1"));
        assert!(!state.is_processed(Some("c3"), "d1"));
        assert!(!state.is_processed(None, "d1"));
    }

    #[test]
    fn resumes_from_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        let mut state = ExtractionState::load(&path);
        state.commit(record("c1", "d1"));
        state.commit(record("c1", "d2"));
        state.snapshot().unwrap();

        let resumed = ExtractionState::load(&path);
        assert_eq!(resumed.len(), 2);
        assert_eq!(resumed.next_index(), 2);
        assert!(resumed.is_processed(Some("c1"), "d1"));
        assert!(resumed.is_processed(Some("c1"), "d2"));
    }

    #[test]
    fn preserves_execution_fields_across_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        let mut state = ExtractionState::load(&path);
        let mut executed = record("c1", "d1");
        executed.blockhash = Some("0xfeed".into());
        executed.blocknumber = 7;
        state.commit(executed.clone());
        state.snapshot().unwrap();

        let resumed = ExtractionState::load(&path);
        assert_eq!(resumed.records()[&0], executed);
    }

    #[test]
    fn corrupt_output_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "not json").unwrap();
        let state = ExtractionState::load(&path);
        assert!(state.is_empty());

        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let state = ExtractionState::load(&path);
        assert!(state.is_empty());
    }

    #[test]
    fn non_numeric_keys_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let mut seeded = ExtractionState::load(&path);
        seeded.commit(record("c1", "d1"));
        seeded.snapshot().unwrap();

        let content = std::fs::read_to_string(&path)
            .unwrap()
            .replace("\"0\"", "\"zero\"");
        std::fs::write(&path, content).unwrap();

        let state = ExtractionState::load(&path);
        assert!(state.is_empty());
        assert_eq!(state.next_index(), 0);
    }
}
