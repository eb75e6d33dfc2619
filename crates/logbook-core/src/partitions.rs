use std::path::{Path, PathBuf};

/// Log files are named `<prefix>-<ISO-like-timestamp>-<id>.log` and live
/// under `root/YYYY/MM/DD/`.
pub const LOG_SUFFIX: &str = "log";

/// Enumerate every log file under a root's date-partitioned subtree.
///
/// Only directories matching the `YYYY/MM/DD` shape are descended into, so a
/// stray non-partition directory inside a root never costs a full walk.
pub fn list_partition_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for day_dir in partition_dirs(root) {
        files.extend(list_log_files(&day_dir));
    }
    files
}

/// Log files directly inside one directory (non-recursive).
pub fn list_log_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == LOG_SUFFIX))
        .collect()
}

/// The `n` most recent `YYYY/MM/DD` day directories under a root, newest
/// first. Used by the periodic rescan to patch watcher blind spots without
/// re-walking the whole tree.
pub fn recent_partition_dirs(root: &Path, n: usize) -> Vec<PathBuf> {
    let mut dirs = partition_dirs(root);
    dirs.reverse();
    dirs.truncate(n);
    dirs
}

/// All day directories under a root, sorted ascending by (year, month, day).
fn partition_dirs(root: &Path) -> Vec<PathBuf> {
    let mut days = Vec::new();

    for year in numeric_subdirs(root, 4) {
        for month in numeric_subdirs(&year, 2) {
            for day in numeric_subdirs(&month, 2) {
                days.push(day);
            }
        }
    }

    // Zero-padded digit names sort correctly as strings.
    days.sort();
    days
}

fn numeric_subdirs(dir: &Path, digits: usize) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut out: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.len() == digits && name.chars().all(|c| c.is_ascii_digit())
        })
        .map(|e| e.path())
        .collect();

    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    #[test]
    fn lists_only_partitioned_log_files() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("2025/01/01/run-a.log"));
        touch(&root.path().join("2025/01/02/run-b.log"));
        touch(&root.path().join("2025/01/02/notes.txt"));
        touch(&root.path().join("archive/old/run-c.log"));
        touch(&root.path().join("2025/01/run-misplaced.log"));

        let files = list_partition_files(root.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "log"));
    }

    #[test]
    fn recent_partitions_are_newest_first() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("2024/12/31/run-a.log"));
        touch(&root.path().join("2025/01/01/run-b.log"));
        touch(&root.path().join("2025/01/02/run-c.log"));

        let recent = recent_partition_dirs(root.path(), 2);
        assert_eq!(recent.len(), 2);
        assert!(recent[0].ends_with("2025/01/02"));
        assert!(recent[1].ends_with("2025/01/01"));
    }

    #[test]
    fn missing_root_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let gone = root.path().join("absent");
        assert!(list_partition_files(&gone).is_empty());
        assert!(recent_partition_dirs(&gone, 2).is_empty());
    }
}
