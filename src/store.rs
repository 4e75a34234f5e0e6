use crate::walk::key_relative_to_root;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Corrupt database {path}: {source}")]
    CorruptDatabase {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn map_io_error(path: &Path, e: std::io::Error) -> StoreError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        StoreError::PermissionDenied(path.to_path_buf())
    } else {
        StoreError::Io(e)
    }
}

/// Digests keyed by algorithm name. `None` records a failed computation.
pub type Digests = BTreeMap<String, Option<String>>;

/// Log of observations keyed by timestamp string.
pub type ObservationLog = BTreeMap<String, Digests>;

/// Checksum history of a single file.
///
/// Serializes as one JSON object: algorithm names map to baseline digests,
/// and the optional `OK` and `WRONG` keys hold the observation logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "OK", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ok: ObservationLog,
    #[serde(rename = "WRONG", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub wrong: ObservationLog,
    #[serde(flatten)]
    pub baseline: Digests,
}

impl Record {
    /// Whether a baseline entry exists for `algorithm`, even a failed one.
    pub fn has_baseline_entry(&self, algorithm: &str) -> bool {
        self.baseline.contains_key(algorithm)
    }

    /// Baseline digest for `algorithm`, or `None` if it was never computed
    /// or its computation failed.
    pub fn baseline(&self, algorithm: &str) -> Option<&str> {
        self.baseline.get(algorithm).and_then(|d| d.as_deref())
    }

    pub fn set_baseline(&mut self, algorithm: &str, digest: Option<String>) {
        self.baseline.insert(algorithm.to_string(), digest);
    }

    /// Most recent OK observation, by timestamp key.
    pub fn last_ok(&self) -> Option<(&str, &Digests)> {
        self.ok.last_key_value().map(|(k, v)| (k.as_str(), v))
    }

    pub fn has_wrong(&self) -> bool {
        !self.wrong.is_empty()
    }

    /// Appends an OK observation. An existing entry with the same timestamp
    /// is kept.
    pub fn record_ok(&mut self, timestamp: &str, algorithm: &str, digest: Option<String>) {
        append(&mut self.ok, timestamp, algorithm, digest);
    }

    pub fn record_wrong(&mut self, timestamp: &str, algorithm: &str, digest: Option<String>) {
        append(&mut self.wrong, timestamp, algorithm, digest);
    }
}

fn append(log: &mut ObservationLog, timestamp: &str, algorithm: &str, digest: Option<String>) {
    log.entry(timestamp.to_string())
        .or_insert_with(|| observation(algorithm, digest));
}

fn observation(algorithm: &str, digest: Option<String>) -> Digests {
    BTreeMap::from([(algorithm.to_string(), digest)])
}

/// Mapping from file path to its checksum history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumStore {
    records: BTreeMap<String, Record>,
}

impl ChecksumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from `path`.
    ///
    /// A missing file yields an empty store. Anything that does not parse as
    /// a mapping of path to record is rejected as `CorruptDatabase`.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(map_io_error(path, e)),
        };

        Self::from_json(&content).map_err(|source| StoreError::CorruptDatabase {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Serialize with keys sorted at every level and 4-space indentation.
    pub fn to_json(&self) -> Result<String, StoreError> {
        // Going through `Value` sorts every object's keys, including the
        // flattened baseline keys relative to `OK` and `WRONG`.
        let value = serde_json::to_value(self)?;

        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut serializer)?;

        // serde_json only ever emits UTF-8.
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Save the store to `path` atomically.
    ///
    /// Writes to a temporary file in the same directory, fsyncs it, then
    /// renames it into place.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        use std::io::Write;

        let content = self.to_json()?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut temp_file =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| map_io_error(parent, e))?;

        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| map_io_error(path, e))?;

        temp_file.as_file().sync_all().map_err(StoreError::Io)?;

        temp_file
            .persist(path)
            .map_err(|e| map_io_error(path, e.error))?;

        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Record> {
        self.records.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Record> {
        self.records.get_mut(path)
    }

    #[allow(dead_code)]
    pub fn upsert(&mut self, path: impl Into<String>, record: Record) {
        self.records.insert(path.into(), record);
    }

    /// Record for `path`, created empty on first sight.
    pub fn record_mut(&mut self, path: &str) -> &mut Record {
        self.records.entry(path.to_string()).or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Moves records keyed as `<root>/<file>` to their relative key.
    ///
    /// A record whose relative key is already taken stays under its old key.
    /// Returns the number of records moved.
    pub fn rebase_keys(&mut self, root: &Path) -> usize {
        let legacy: Vec<(String, String)> = self
            .records
            .keys()
            .map(|key| (key.clone(), key_relative_to_root(key, root)))
            .filter(|(key, relative)| key != relative && !self.records.contains_key(relative))
            .collect();

        for (key, relative) in &legacy {
            if let Some(record) = self.records.remove(key) {
                self.records.insert(relative.clone(), record);
            }
        }
        legacy.len()
    }

    /// Records in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record() -> Record {
        let mut record = Record::default();
        record.set_baseline("md5", Some("abc123".to_string()));
        record.set_baseline("sha256", None);
        record.record_ok("2021-03-01_10:00:00", "md5", Some("abc123".to_string()));
        record.record_wrong("2021-04-01_10:00:00", "md5", Some("def456".to_string()));
        record
    }

    #[test]
    fn test_parse_legacy_layout() {
        let json = r#"{
    "data/a.txt": {
        "OK": {
            "2021-03-05_11:22:33": {
                "md5": "5d41402abc4b2a76b9719d911017c592"
            }
        },
        "md5": "5d41402abc4b2a76b9719d911017c592"
    },
    "data/b.txt": {
        "md5": null
    }
}"#;

        let store = ChecksumStore::from_json(json).unwrap();
        assert_eq!(store.len(), 2);

        let a = store.get("data/a.txt").unwrap();
        assert_eq!(a.baseline("md5"), Some("5d41402abc4b2a76b9719d911017c592"));
        assert_eq!(a.last_ok().unwrap().0, "2021-03-05_11:22:33");
        assert!(a.wrong.is_empty());

        let b = store.get("data/b.txt").unwrap();
        assert!(b.has_baseline_entry("md5"));
        assert_eq!(b.baseline("md5"), None);
    }

    #[test]
    fn test_top_level_must_be_object() {
        assert!(ChecksumStore::from_json("[]").is_err());
        assert!(ChecksumStore::from_json("42").is_err());
        assert!(ChecksumStore::from_json("{").is_err());
    }

    #[test]
    fn test_record_shape_is_validated() {
        // A record must be an object.
        assert!(ChecksumStore::from_json(r#"{"a.txt": "abc"}"#).is_err());
        // Baseline digests must be strings or null.
        assert!(ChecksumStore::from_json(r#"{"a.txt": {"md5": 5}}"#).is_err());
        assert!(ChecksumStore::from_json(r#"{"a.txt": {"md5": {"x": "y"}}}"#).is_err());
        // Observation logs map timestamps to digest maps.
        assert!(ChecksumStore::from_json(r#"{"a.txt": {"OK": ["x"]}}"#).is_err());
        assert!(ChecksumStore::from_json(r#"{"a.txt": {"OK": {"t": "abc"}}}"#).is_err());
        assert!(ChecksumStore::from_json(r#"{"a.txt": {"WRONG": {"t": {"md5": 1}}}}"#).is_err());
    }

    #[test]
    fn test_output_keys_sorted_and_indented() {
        let mut store = ChecksumStore::new();
        store.upsert("z.txt", sample_record());
        store.upsert("a.txt", Record::default());

        let json = store.to_json().unwrap();

        let expected = r#"{
    "a.txt": {},
    "z.txt": {
        "OK": {
            "2021-03-01_10:00:00": {
                "md5": "abc123"
            }
        },
        "WRONG": {
            "2021-04-01_10:00:00": {
                "md5": "def456"
            }
        },
        "md5": "abc123",
        "sha256": null
    }
}"#;
        assert_eq!(json, expected);
        assert_eq!(json, store.to_json().unwrap());
    }

    #[test]
    fn test_load_and_save() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("db.json");

        let mut store = ChecksumStore::new();
        store.upsert("dir/file.txt", sample_record());
        store.upsert("other.txt", Record::default());
        store.save(&db_path).unwrap();

        let loaded = ChecksumStore::load(&db_path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();

        let store = ChecksumStore::load(&temp.path().join("absent.json")).unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("db.json");
        std::fs::write(&db_path, "{ not json").unwrap();

        match ChecksumStore::load(&db_path) {
            Err(StoreError::CorruptDatabase { path, .. }) => assert_eq!(path, db_path),
            other => panic!("Expected CorruptDatabase, got {other:?}"),
        }
    }

    #[test]
    fn test_save_replaces_existing_file_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("db.json");
        std::fs::write(&db_path, "old content").unwrap();

        let mut store = ChecksumStore::new();
        store.upsert("a.txt", sample_record());
        store.save(&db_path).unwrap();

        assert_eq!(ChecksumStore::load(&db_path).unwrap(), store);
        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("db.json")]);
    }

    #[test]
    fn test_last_ok_picks_latest_timestamp() {
        let mut record = Record::default();
        record.record_ok("2021-05-01_00:00:00", "md5", Some("a".to_string()));
        record.record_ok("2021-12-01_00:00:00", "md5", Some("b".to_string()));
        record.record_ok("2021-06-01_00:00:00", "md5", Some("c".to_string()));

        let (timestamp, digests) = record.last_ok().unwrap();
        assert_eq!(timestamp, "2021-12-01_00:00:00");
        assert_eq!(digests.get("md5").unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_observations_are_never_rewritten() {
        let mut record = Record::default();
        record.record_ok("2021-05-01_00:00:00", "md5", Some("first".to_string()));
        record.record_ok("2021-05-01_00:00:00", "md5", Some("second".to_string()));
        record.record_wrong("2021-05-02_00:00:00", "md5", None);
        record.record_wrong("2021-05-02_00:00:00", "md5", Some("later".to_string()));

        assert_eq!(record.ok.len(), 1);
        let (_, digests) = record.last_ok().unwrap();
        assert_eq!(digests.get("md5").unwrap().as_deref(), Some("first"));
        assert_eq!(record.wrong.len(), 1);
        assert_eq!(record.wrong["2021-05-02_00:00:00"].get("md5"), Some(&None));
    }

    #[test]
    fn test_rebase_keys_strips_root_prefix() {
        let mut store = ChecksumStore::new();
        store.upsert("data/a.txt", sample_record());
        store.upsert("data/sub/b.txt", Record::default());
        store.upsert("c.txt", Record::default());
        // Both spellings present: the relative record wins.
        store.upsert("data/c.txt", sample_record());

        let moved = store.rebase_keys(Path::new("data"));

        assert_eq!(moved, 2);
        let keys: Vec<&str> = store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a.txt", "c.txt", "data/c.txt", "sub/b.txt"]);
        assert_eq!(store.get("a.txt"), Some(&sample_record()));
        assert_eq!(store.get("c.txt"), Some(&Record::default()));
    }

    #[test]
    fn test_set_baseline_overwrites() {
        let mut record = Record::default();
        record.set_baseline("md5", Some("first".to_string()));
        record.set_baseline("md5", Some("second".to_string()));

        assert_eq!(record.baseline.len(), 1);
        assert_eq!(record.baseline("md5"), Some("second"));
    }

    #[test]
    fn test_record_mut_creates_lazily() {
        let mut store = ChecksumStore::new();
        assert!(store.get("new.txt").is_none());

        store
            .record_mut("new.txt")
            .set_baseline("md5", Some("x".to_string()));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("new.txt").unwrap().baseline("md5"), Some("x"));
    }
}
