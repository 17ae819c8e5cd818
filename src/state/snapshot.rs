//! Atomic, fsync'd persistence of the extraction output.

use crate::error::ExtractError;
use crate::types::BatchRecord;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Atomically write the full record mapping to `path`.
///
/// The mapping is serialized to a sibling `.tmp` file, flushed and synced
/// to storage, then renamed over the target. The target path therefore
/// always holds either the previous complete snapshot or the new one, even
/// if the process dies mid-write. Keys are emitted as decimal strings in
/// numeric order, matching what the execution driver reads back.
pub fn write_snapshot(
    path: &Path,
    records: &BTreeMap<u64, BatchRecord>,
) -> Result<(), ExtractError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ExtractError::Snapshot {
                path: path.to_owned(),
                source,
            })?;
        }
    }

    let mut map = Map::with_capacity(records.len());
    for (index, record) in records {
        let value = serde_json::to_value(record).map_err(|source| {
            ExtractError::SnapshotEncode {
                path: path.to_owned(),
                source,
            }
        })?;
        map.insert(index.to_string(), value);
    }

    let tmp = tmp_path(path);
    let io_err = |source| ExtractError::Snapshot {
        path: path.to_owned(),
        source,
    };

    let file = File::create(&tmp).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &Value::Object(map)).map_err(|source| {
        ExtractError::SnapshotEncode {
            path: path.to_owned(),
            source,
        }
    })?;
    writer.flush().map_err(io_err)?;
    writer.get_ref().sync_all().map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;

    debug!("Snapshot written: {} (count={})", path.display(), records.len());
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map_or_else(OsString::new, OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BatchRecord;
    use tempfile::TempDir;

    fn record(digest: &str) -> BatchRecord {
        BatchRecord {
            cert_id: Some("c1".into()),
            round: Some(9),
            author: Some("auth".into()),
            batch_digest: digest.into(),
            transactions: vec!["0xaa".into()],
            blockhash: None,
            blocknumber: -1,
        }
    }

    #[test]
    fn writes_keys_in_numeric_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        let mut records = BTreeMap::new();
        for index in 0..11 {
            records.insert(index, record(&format!("d{index}")));
        }
        write_snapshot(&path, &records).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        // "10" must come after "9", not between "1" and "2".
        assert!(content.find("\"9\"").unwrap() < content.find("\"10\"").unwrap());

        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.as_object().unwrap().len(), 11);
        assert_eq!(parsed["0"]["batch_digest"], "d0");
        assert_eq!(parsed["0"]["blockhash"], serde_json::Value::Null);
        assert_eq!(parsed["0"]["blocknumber"], -1);
    }

    #[test]
    fn replaces_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        let mut records = BTreeMap::new();
        records.insert(0, record("d0"));
        write_snapshot(&path, &records).unwrap();

        records.insert(1, record("d1"));
        write_snapshot(&path, &records).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.as_object().unwrap().len(), 2);
    }

    #[test]
    fn leaves_no_tmp_file_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_snapshot(&path, &BTreeMap::new()).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("out.json.tmp").exists());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/out.json");
        write_snapshot(&path, &BTreeMap::new()).unwrap();
        assert!(path.exists());
    }
}
