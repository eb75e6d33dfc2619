use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::Result;
use crate::tables::{
    CachedDetails, CachedSummary, DETAIL_TABLE_VERSION, DetailTable, SUMMARY_TABLE_VERSION,
    SummaryTable, TableFile,
};

const SUMMARIES_FILE: &str = "summaries.json";
const DETAILS_FILE: &str = "details.json";

/// Persistence for the two cache tiers.
///
/// Loads fail open: a missing, unreadable, corrupt, or version-mismatched
/// snapshot yields an empty table and a warning, never a startup failure.
/// Saves serialize the whole table to a `.tmp` sibling and rename over the
/// live file, so readers never observe a torn document.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_summaries(&self) -> SummaryTable {
        match self.load_table::<CachedSummary>(SUMMARIES_FILE, SUMMARY_TABLE_VERSION) {
            Some(file) => SummaryTable::from_file(file),
            None => SummaryTable::default(),
        }
    }

    pub fn load_details(&self) -> DetailTable {
        match self.load_table::<CachedDetails>(DETAILS_FILE, DETAIL_TABLE_VERSION) {
            Some(file) => DetailTable::from_file(file),
            None => DetailTable::default(),
        }
    }

    pub fn save_summaries(&self, table: &SummaryTable) -> Result<()> {
        self.save_table(SUMMARIES_FILE, &table.to_file(now_ms()))
    }

    pub fn save_details(&self, table: &DetailTable) -> Result<()> {
        self.save_table(DETAILS_FILE, &table.to_file(now_ms()))
    }

    fn load_table<E: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        expected_version: &str,
    ) -> Option<TableFile<E>> {
        let path = self.dir.join(name);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cache snapshot unreadable, starting empty");
                return None;
            }
        };

        let file: TableFile<E> = match serde_json::from_str(&raw) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cache snapshot corrupt, starting empty");
                return None;
            }
        };

        if file.version != expected_version {
            tracing::warn!(
                path = %path.display(),
                found = %file.version,
                expected = %expected_version,
                "cache snapshot version mismatch, starting empty"
            );
            return None;
        }

        Some(file)
    }

    fn save_table<E: serde::Serialize>(&self, name: &str, file: &TableFile<E>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string(file)?;
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logbook_core::CanonicalKey;
    use logbook_types::{FileSignature, ProjectKey, ResumeInfo, ShellKind, Summary};
    use std::path::PathBuf;

    fn sample_summary(id: &str) -> Summary {
        Summary {
            id: id.to_string(),
            title: id.to_string(),
            timestamp_ms: 1_700_000_000_000,
            file_path: PathBuf::from(format!("/logs/2025/01/01/run-{id}.log")),
            raw_timestamp_text: None,
            project_key: ProjectKey::new("deadbeef"),
            preview: None,
            resume: ResumeInfo::unknown(),
            shell_kind: ShellKind::Unknown,
        }
    }

    #[test]
    fn roundtrip_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());

        let mut table = SummaryTable::default();
        let key = CanonicalKey::from_normalized("/logs/2025/01/01/run-a.log");
        table.insert(
            key.clone(),
            FileSignature::new(1_700_000_000_000, 42),
            sample_summary("a"),
        );
        store.save_summaries(&table).unwrap();

        let loaded = store.load_summaries();
        assert_eq!(loaded.len(), 1);
        let cached = loaded.get(&key).unwrap();
        assert_eq!(cached.sig, FileSignature::new(1_700_000_000_000, 42));
        assert_eq!(cached.summary.id, "a");
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("never-created"));
        assert!(store.load_summaries().is_empty());
        assert!(store.load_details().is_empty());
    }

    #[test]
    fn corrupt_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("summaries.json"), "{torn write").unwrap();
        let store = CacheStore::new(dir.path());
        assert!(store.load_summaries().is_empty());
    }

    #[test]
    fn version_mismatch_invalidates_whole_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());

        let mut table = SummaryTable::default();
        table.insert(
            CanonicalKey::from_normalized("/logs/run-a.log"),
            FileSignature::new(1, 1),
            sample_summary("a"),
        );
        store.save_summaries(&table).unwrap();

        // Rewrite the snapshot with a foreign version string.
        let path = dir.path().join("summaries.json");
        let text = std::fs::read_to_string(&path)
            .unwrap()
            .replace(r#""version":"1""#, r#""version":"0""#);
        std::fs::write(&path, text).unwrap();

        assert!(store.load_summaries().is_empty());
    }

    #[test]
    fn save_leaves_no_tmp_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        store.save_summaries(&SummaryTable::default()).unwrap();
        store.save_details(&DetailTable::default()).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn snapshot_document_shape_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());

        let mut table = SummaryTable::default();
        table.insert(
            CanonicalKey::from_normalized("/logs/run-a.log"),
            FileSignature::new(5, 9),
            sample_summary("a"),
        );
        store.save_summaries(&table).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("summaries.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], "1");
        assert!(value["savedAt"].as_i64().unwrap() > 0);
        let entry = &value["files"]["/logs/run-a.log"];
        assert_eq!(entry["sig"]["mtimeMs"], 5);
        assert_eq!(entry["sig"]["size"], 9);
        assert_eq!(entry["summary"]["id"], "a");
    }
}
