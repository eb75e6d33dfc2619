use logbook_types::FileSignature;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Compute the live change fingerprint for a file.
///
/// Returns `Ok(None)` when the path does not exist or is not a regular file;
/// both cases mean "file gone" to callers. Any other stat failure surfaces as
/// an error.
pub fn signature_of(path: &Path) -> io::Result<Option<FileSignature>> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };

    if !metadata.is_file() {
        return Ok(None);
    }

    let mtime_ms = metadata
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);

    Ok(Some(FileSignature::new(mtime_ms, metadata.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let sig = signature_of(&dir.path().join("absent.log")).unwrap();
        assert!(sig.is_none());
    }

    #[test]
    fn directory_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(signature_of(dir.path()).unwrap().is_none());
    }

    #[test]
    fn signature_tracks_size_and_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run-a.log");
        std::fs::write(&path, "one\n").unwrap();

        let first = signature_of(&path).unwrap().unwrap();
        assert_eq!(first.size, 4);

        std::fs::write(&path, "one\ntwo\n").unwrap();
        let second = signature_of(&path).unwrap().unwrap();
        assert_ne!(first, second);

        // Same content but different mtime must also read as changed.
        filetime::set_file_mtime(&path, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
        let third = signature_of(&path).unwrap().unwrap();
        assert_ne!(second, third);
        assert_eq!(third.mtime_ms, 1_700_000_000_000);
    }
}
