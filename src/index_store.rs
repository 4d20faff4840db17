use crate::error::AppError;
use crate::metadata::{IndexEntry, IndexRecord};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// `path` with `suffix` appended to its file name, e.g. `index.json.tmp`.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// The JSON document holding every saved image record.
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the index. A missing document or one that is not a JSON array
    /// is an empty index. Any other read failure is fatal so the existing
    /// file is never overwritten blind.
    pub fn load(&self) -> Result<Vec<IndexEntry>, AppError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No index at {:?}, starting empty.", self.path);
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AppError::IndexUnreadable {
                    path: self.path.to_string_lossy().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&contents) {
            Ok(values) => values,
            Err(e) => {
                log::warn!("Index {:?} is not a JSON array ({}). Starting empty.", self.path, e);
                return Ok(Vec::new());
            }
        };

        let entries: Vec<IndexEntry> = values.into_iter().map(IndexEntry::from_value).collect();
        log::debug!("Loaded {} index entries from {:?}", entries.len(), self.path);
        Ok(entries)
    }

    /// Overwrites the index with `entries`. The document is written to a
    /// sibling file first and renamed into place.
    pub fn save(&self, entries: &[IndexEntry]) -> Result<(), AppError> {
        let persistence = |reason: String| AppError::IndexPersistence {
            path: self.path.to_string_lossy().to_string(),
            reason,
        };

        let json = serde_json::to_string_pretty(entries).map_err(|e| persistence(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| persistence(e.to_string()))?;
        }

        let tmp_path = sibling_path(&self.path, ".tmp");
        fs::write(&tmp_path, json).map_err(|e| persistence(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            persistence(e.to_string())
        })?;
        log::debug!("Wrote {} entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}

/// In-memory index for one run: the entries in append order plus the set of
/// filenames already present.
#[derive(Debug, Default)]
pub struct Index {
    entries: Vec<IndexEntry>,
    filenames: HashSet<String>,
}

impl Index {
    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        let filenames = entries
            .iter()
            .filter_map(|e| e.filename().map(str::to_string))
            .collect();
        Self { entries, filenames }
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.filenames.contains(filename)
    }

    /// Appends `record` unless its filename is already indexed. Returns
    /// whether the record was added.
    pub fn insert(&mut self, record: IndexRecord) -> bool {
        if !self.filenames.insert(record.filename.clone()) {
            return false;
        }
        self.entries.push(IndexEntry::Record(record));
        true
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn records(&self) -> impl Iterator<Item = &IndexRecord> {
        self.entries.iter().filter_map(IndexEntry::record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of records for `category` added on `day` (`YYYY-MM-DD`).
    pub fn saved_on(&self, category: &str, day: &str) -> usize {
        self.records()
            .filter(|r| r.category.as_deref() == Some(category) && r.added_on(day))
            .count()
    }

    pub fn counts_by_category(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for entry in &self.entries {
            let category = match entry {
                IndexEntry::Record(record) => {
                    record.category.clone().unwrap_or_else(|| "(none)".to_string())
                }
                IndexEntry::Unrecognized(_) => "(unrecognized)".to_string(),
            };
            *counts.entry(category).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn record(filename: &str, category: &str, date_added: &str) -> IndexRecord {
        IndexRecord {
            filename: filename.to_string(),
            source_url: format!("https://example.com/{}", filename),
            category: Some(category.to_string()),
            provider: Some("Pexels".to_string()),
            width: 1080,
            height: 720,
            tags: vec!["birds".to_string()],
            date_added: date_added.to_string(),
            ..Default::default()
        }
    }

    fn entries(records: &[IndexRecord]) -> Vec<IndexEntry> {
        records.iter().cloned().map(IndexEntry::Record).collect()
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path().join("index.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, "[{\"filename\": \"a.jpg\"").unwrap();
        assert!(IndexStore::new(&path).load().unwrap().is_empty());

        fs::write(&path, "{\"filename\": \"a.jpg\"}").unwrap();
        assert!(IndexStore::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn unreadable_index_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        fs::create_dir(&path).unwrap();

        let err = IndexStore::new(&path).load().unwrap_err();
        assert!(matches!(err, AppError::IndexUnreadable { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn load_then_save_keeps_every_entry_and_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        fs::write(
            &path,
            r#"[
                {"filename": "images/a.jpg", "source_url": "u", "rating": 5},
                {"filename": "images/b.jpg", "tags": null},
                {"file": "images/c.jpg", "width": 1080.0},
                {"filename": "images/d.jpg", "width": "wide"},
                42
            ]"#,
        )
        .unwrap();
        let store = IndexStore::new(&path);

        let loaded = store.load().unwrap();
        store.save(&loaded).unwrap();
        let written: Vec<Value> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(written.len(), 5);
        assert_eq!(written[0]["filename"], json!("images/a.jpg"));
        assert_eq!(written[0]["rating"], json!(5));
        assert_eq!(written[1]["filename"], json!("images/b.jpg"));
        assert_eq!(written[2]["filename"], json!("images/c.jpg"));
        assert_eq!(written[2]["width"], json!(1080));
        assert_eq!(written[3], json!({"filename": "images/d.jpg", "width": "wide"}));
        assert_eq!(written[4], json!(42));

        let index = Index::from_entries(store.load().unwrap());
        for name in ["images/a.jpg", "images/b.jpg", "images/c.jpg", "images/d.jpg"] {
            assert!(index.contains(name), "{} missing", name);
        }
    }

    #[test]
    fn load_then_save_preserves_records_and_order() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path().join("index.json"));
        let records = entries(&[
            record("images/tablet/b.jpg", "tablet", "2026-10-17T10:00:00Z"),
            record("images/mobile/a.jpg", "mobile", "2026-10-18T09:00:00Z"),
        ]);
        store.save(&records).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, records);

        store.save(&loaded).unwrap();
        assert_eq!(store.load().unwrap(), records);
        assert!(!dir.path().join("index.json.tmp").exists());
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path().join("data").join("index.json"));
        store.save(&entries(&[record("a.jpg", "mobile", "2026-10-18")])).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn save_into_unwritable_location_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "").unwrap();
        let store = IndexStore::new(blocker.join("index.json"));
        let err = store.save(&[]).unwrap_err();
        assert!(matches!(err, AppError::IndexPersistence { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn duplicate_filenames_are_not_appended() {
        let mut index = Index::from_entries(entries(&[record("a.jpg", "mobile", "2026-10-18")]));
        assert!(index.contains("a.jpg"));
        assert!(!index.insert(record("a.jpg", "tablet", "2026-10-18")));
        assert!(index.insert(record("b.jpg", "tablet", "2026-10-18")));
        assert_eq!(index.len(), 2);
        assert_eq!(index.records().next().unwrap().category.as_deref(), Some("mobile"));
    }

    #[test]
    fn unrecognized_entries_still_reserve_their_filename() {
        let mut index = Index::from_entries(vec![IndexEntry::Unrecognized(
            json!({"filename": "a.jpg", "width": "wide"}),
        )]);
        assert!(!index.insert(record("a.jpg", "mobile", "2026-10-18")));
        assert_eq!(index.records().count(), 0);
        assert_eq!(index.counts_by_category()["(unrecognized)"], 1);
    }

    #[test]
    fn saved_on_counts_only_matching_category_and_day() {
        let index = Index::from_entries(entries(&[
            record("a.jpg", "mobile", "2026-10-18T01:00:00Z"),
            record("b.jpg", "mobile", "2026-10-17T23:59:00Z"),
            record("c.jpg", "tablet", "2026-10-18T02:00:00Z"),
        ]));
        assert_eq!(index.saved_on("mobile", "2026-10-18"), 1);
        assert_eq!(index.saved_on("tablet", "2026-10-18"), 1);
        assert_eq!(index.saved_on("desktop", "2026-10-18"), 0);

        let counts = index.counts_by_category();
        assert_eq!(counts["mobile"], 2);
        assert_eq!(counts["tablet"], 1);
    }
}
