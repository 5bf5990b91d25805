//! Dataset snapshots on disk.
//!
//! Each dataset lives in `<data_dir>/<id>.json` as
//! `{"id": .., "kind": "sections"|"rooms", "numRows": .., "records": [..]}`.
//! Older snapshots that name the record array `section` are still accepted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use insight_core::{Dataset, DatasetKind};

use crate::error::{AppError, AppResult};
use crate::facade::InsightFacade;

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    id: String,
    kind: DatasetKind,
    #[serde(alias = "section")]
    records: Vec<Value>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    id: &'a str,
    kind: DatasetKind,
    #[serde(rename = "numRows")]
    num_rows: usize,
    records: &'a [Value],
}

/// Path of the snapshot for dataset `id`
pub fn snapshot_path(data_dir: &Path, id: &str) -> PathBuf {
    data_dir.join(format!("{}.json", id))
}

/// Register every snapshot in `data_dir` with the facade.
///
/// Files that cannot be read or parsed, whose name is not `<id>.json`, or
/// that the facade rejects, are logged and skipped. A missing directory
/// loads nothing. Returns the ids that were loaded.
pub fn load_snapshots(facade: &mut InsightFacade, data_dir: &Path) -> AppResult<Vec<String>> {
    if !data_dir.is_dir() {
        debug!("Data directory {} does not exist", data_dir.display());
        return Ok(vec![]);
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut loaded = Vec::new();
    for path in paths {
        match load_snapshot(facade, &path) {
            Ok(id) => loaded.push(id),
            Err(e) => warn!("Skipping snapshot {}: {}", path.display(), e),
        }
    }

    info!(
        "Loaded {} dataset(s) from {}",
        loaded.len(),
        data_dir.display()
    );
    Ok(loaded)
}

fn load_snapshot(facade: &mut InsightFacade, path: &Path) -> AppResult<String> {
    let content = std::fs::read_to_string(path)?;
    let snapshot: SnapshotFile = serde_json::from_str(&content)?;
    if path.file_stem().and_then(|stem| stem.to_str()) != Some(snapshot.id.as_str()) {
        return Err(AppError::InvalidDataset(format!(
            "snapshot for '{}' must be named {}.json",
            snapshot.id, snapshot.id
        )));
    }
    facade.add_dataset(&snapshot.id, snapshot.kind, snapshot.records)?;
    Ok(snapshot.id)
}

/// Write a dataset snapshot, creating `data_dir` if needed.
pub fn write_snapshot(data_dir: &Path, dataset: &Dataset) -> AppResult<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    let path = snapshot_path(data_dir, &dataset.id);
    let snapshot = SnapshotRef {
        id: &dataset.id,
        kind: dataset.kind,
        num_rows: dataset.records.len(),
        records: &dataset.records,
    };
    std::fs::write(&path, serde_json::to_string(&snapshot)?)?;
    debug!("Wrote snapshot {}", path.display());
    Ok(path)
}

/// Delete the snapshot for dataset `id`.
pub fn remove_snapshot(data_dir: &Path, id: &str) -> AppResult<()> {
    let path = snapshot_path(data_dir, id);
    if !path.exists() {
        return Err(AppError::DatasetNotFound(id.to_string()));
    }
    std::fs::remove_file(&path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_core::DatasetStore;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_loads_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut facade = InsightFacade::new();
        let loaded = load_snapshots(&mut facade, &tmp.path().join("absent")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_snapshots() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("sections.json"),
            json!({
                "id": "sections",
                "kind": "sections",
                "numRows": 1,
                "section": [{"dept": "cpsc", "avg": 95}]
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("rooms.json"),
            json!({"id": "rooms", "kind": "rooms", "records": [{"rooms_seats": 40}]}).to_string(),
        )
        .unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let mut facade = InsightFacade::new();
        let loaded = load_snapshots(&mut facade, tmp.path()).unwrap();
        assert_eq!(loaded, vec!["rooms", "sections"]);

        let sections = facade.store().dataset("sections").unwrap();
        assert_eq!(sections.records[0]["sections_avg"], 95);
    }

    #[test]
    fn test_bad_snapshots_are_skipped() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(
            tmp.path().join("bad_id.json"),
            json!({"id": "bad_id", "kind": "rooms", "records": []}).to_string(),
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("unknown.json"),
            json!({"id": "courses", "kind": "courses", "records": []}).to_string(),
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("rooms.json"),
            json!({"id": "rooms", "kind": "rooms", "records": []}).to_string(),
        )
        .unwrap();

        let mut facade = InsightFacade::new();
        let loaded = load_snapshots(&mut facade, tmp.path()).unwrap();
        assert_eq!(loaded, vec!["rooms"]);
    }

    #[test]
    fn test_snapshot_name_must_match_id() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("backup.json"),
            json!({"id": "rooms", "kind": "rooms", "records": []}).to_string(),
        )
        .unwrap();

        let mut facade = InsightFacade::new();
        assert!(load_snapshots(&mut facade, tmp.path()).unwrap().is_empty());
        assert!(facade.store().dataset("rooms").is_none());
    }

    #[test]
    fn test_write_then_load() {
        let tmp = TempDir::new().unwrap();
        let data_dir = tmp.path().join("data");
        let dataset = Dataset::new(
            "rooms",
            DatasetKind::Rooms,
            vec![json!({"rooms_name": "DMP_110", "rooms_seats": 120})],
        );

        let path = write_snapshot(&data_dir, &dataset).unwrap();
        assert_eq!(path, snapshot_path(&data_dir, "rooms"));

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["numRows"], 1);

        let mut facade = InsightFacade::new();
        load_snapshots(&mut facade, &data_dir).unwrap();
        let stored = facade.store().dataset("rooms").unwrap();
        assert_eq!(stored.records, dataset.records);

        remove_snapshot(&data_dir, "rooms").unwrap();
        assert!(matches!(
            remove_snapshot(&data_dir, "rooms"),
            Err(AppError::DatasetNotFound(_))
        ));
    }
}
