use logbook_runtime::{IndexEvent, ServiceConfig, SessionIndexService};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;

fn write_log(root: &Path, partition: &str, name: &str, lines: &[&str]) -> PathBuf {
    let dir = root.join(partition);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn basic_log_lines() -> Vec<&'static str> {
    vec![
        r#"{"id":"abc","timestamp":"2025-01-01T00:00:00Z","cwd":"/home/dev/project"}"#,
        r#"{"type":"message","role":"user","content":"hello"}"#,
    ]
}

fn test_config(state_dir: &Path, root: &Path) -> ServiceConfig {
    let mut config = ServiceConfig::new(state_dir, vec![root.to_path_buf()]);
    config.retry_backoff = vec![
        Duration::from_millis(30),
        Duration::from_millis(30),
        Duration::from_millis(30),
    ];
    config.rescan_interval = Duration::from_millis(100);
    config.local_debounce = Duration::from_millis(20);
    config
}

async fn wait_for<F>(rx: &mut broadcast::Receiver<IndexEvent>, mut predicate: F) -> IndexEvent
where
    F: FnMut(&IndexEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for index event")
}

#[tokio::test]
async fn crawl_is_idempotent_when_nothing_changes() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    write_log(
        root.path(),
        "2025/01/01",
        "run-2025-01-01T00-00-00-abc.log",
        &basic_log_lines(),
    );
    write_log(
        root.path(),
        "2025/01/02",
        "run-2025-01-02T09-00-00-def.log",
        &basic_log_lines(),
    );

    let service = SessionIndexService::open(test_config(state.path(), root.path()));

    let first = service.crawl_once().await;
    assert_eq!(first.scanned, 2);
    assert_eq!(first.parsed, 2);
    assert_eq!(first.added, 2);

    let summaries_before = service.list_summaries();

    let second = service.crawl_once().await;
    assert_eq!(second.scanned, 2);
    assert_eq!(second.parsed, 0, "unchanged files must not re-parse");
    assert_eq!(service.list_summaries(), summaries_before);
}

#[tokio::test]
async fn persisted_cache_survives_reopen() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    write_log(
        root.path(),
        "2025/01/01",
        "run-2025-01-01T00-00-00-abc.log",
        &basic_log_lines(),
    );

    {
        let service = SessionIndexService::open(test_config(state.path(), root.path()));
        let stats = service.crawl_once().await;
        assert_eq!(stats.parsed, 1);
    }

    let reopened = SessionIndexService::open(test_config(state.path(), root.path()));
    assert_eq!(reopened.len(), 1, "tables load from the snapshot");
    let stats = reopened.crawl_once().await;
    assert_eq!(stats.parsed, 0, "signatures from the snapshot still match");
}

#[tokio::test]
async fn differently_spelled_paths_map_to_one_entry() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let path = write_log(
        root.path(),
        "2025/01/01",
        "run-2025-01-01T00-00-00-abc.log",
        &basic_log_lines(),
    );

    let service = SessionIndexService::open(test_config(state.path(), root.path()));
    service.crawl_once().await;
    assert_eq!(service.len(), 1);

    // Same physical file reached through a redundant spelling.
    let spelled = root
        .path()
        .join("2025")
        .join(".")
        .join("..")
        .join("2025")
        .join("01")
        .join("01")
        .join("run-2025-01-01T00-00-00-abc.log");
    let details = service.get_details(&spelled).await.unwrap().unwrap();
    assert_eq!(details.id, "abc");
    assert_eq!(service.len(), 1, "no second entry for the alternate spelling");

    service.remove_file(&spelled).await.unwrap();
    assert_eq!(service.len(), 0);
    assert!(service.get_details(&path).await.unwrap().is_some(), "re-parse after explicit removal still works");
}

#[tokio::test]
async fn retry_caps_at_three_attempts_and_clears_state() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    // No cwd anywhere; the project key can never be promoted.
    write_log(
        root.path(),
        "2025/01/01",
        "run-2025-01-01T00-00-00-abc.log",
        &[
            r#"{"id":"abc","timestamp":"2025-01-01T00:00:00Z"}"#,
            r#"{"type":"message","role":"user","content":"short note"}"#,
        ],
    );

    let service = SessionIndexService::open(test_config(state.path(), root.path()));
    let stats = service.crawl_once().await;
    assert_eq!(stats.added, 1);
    assert_eq!(service.pending_retries(), 1, "provisional key schedules a retry");

    // Three 30ms attempts; give them room to run out.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(service.pending_retries(), 0, "retry state clears after the cap");

    let summary = &service.list_summaries()[0];
    let file = root
        .path()
        .join("2025/01/01/run-2025-01-01T00-00-00-abc.log");
    assert_eq!(
        summary.project_key,
        logbook_core::project_key_from_dir(&file),
        "exhausted retries leave the provisional key"
    );
}

#[tokio::test]
async fn retry_promotes_provisional_key_once_cwd_appears() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let path = write_log(
        root.path(),
        "2025/01/01",
        "run-2025-01-01T00-00-00-abc.log",
        &[
            r#"{"id":"abc","timestamp":"2025-01-01T00:00:00Z"}"#,
            r#"{"type":"message","role":"user","content":"short note"}"#,
        ],
    );

    let service = SessionIndexService::open(test_config(state.path(), root.path()));
    let mut events = service.subscribe();
    service.crawl_once().await;
    assert_eq!(service.pending_retries(), 1);

    // The writer appends the working directory after the file was first seen.
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("\n{\"type\":\"state\",\"cwd\":\"/home/dev/project\"}");
    std::fs::write(&path, content).unwrap();

    let promoted = logbook_core::project_key_from_cwd("/home/dev/project");
    let event = wait_for(&mut events, |event| {
        matches!(event, IndexEvent::Updated(summary) if summary.project_key == promoted)
    })
    .await;
    match event {
        IndexEvent::Updated(summary) => assert_eq!(summary.id, "abc"),
        _ => unreachable!(),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.pending_retries(), 0, "promotion clears retry state");
}

#[tokio::test]
async fn deleted_file_is_never_served_from_cache() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let path = write_log(
        root.path(),
        "2025/01/01",
        "run-2025-01-01T00-00-00-abc.log",
        &basic_log_lines(),
    );

    let service = SessionIndexService::open(test_config(state.path(), root.path()));
    service.crawl_once().await;
    assert!(service.get_details(&path).await.unwrap().is_some());

    std::fs::remove_file(&path).unwrap();
    assert!(service.get_details(&path).await.unwrap().is_none());
    assert!(service.list_summaries().is_empty(), "stale entry pruned on access");
}

#[tokio::test]
async fn crawl_prunes_entries_for_vanished_files() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let path = write_log(
        root.path(),
        "2025/01/01",
        "run-2025-01-01T00-00-00-abc.log",
        &basic_log_lines(),
    );

    let service = SessionIndexService::open(test_config(state.path(), root.path()));
    service.crawl_once().await;
    assert_eq!(service.len(), 1);

    std::fs::remove_file(&path).unwrap();
    let stats = service.crawl_once().await;
    assert_eq!(stats.removed, 1);
    assert!(service.list_summaries().is_empty());
}

#[tokio::test]
async fn explicit_remove_emits_removed_notice() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let path = write_log(
        root.path(),
        "2025/01/01",
        "run-2025-01-01T00-00-00-abc.log",
        &basic_log_lines(),
    );

    let service = SessionIndexService::open(test_config(state.path(), root.path()));
    service.crawl_once().await;

    let mut events = service.subscribe();
    service.remove_file(&path).await.unwrap();
    let event = wait_for(&mut events, |event| matches!(event, IndexEvent::Removed(_))).await;
    match event {
        IndexEvent::Removed(removed) => assert_eq!(removed, path),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn start_stop_start_is_idempotent() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("2025/01/01")).unwrap();

    let service = SessionIndexService::open(test_config(state.path(), root.path()));
    service.start().unwrap();
    service.start().unwrap();
    assert!(service.is_running());

    service.stop();
    service.stop();
    assert!(!service.is_running());

    service.start().unwrap();
    assert!(service.is_running());
    service.stop();
}

#[tokio::test]
async fn running_service_picks_up_new_appends_and_deletes() {
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("2025/01/01")).unwrap();

    let service = SessionIndexService::open(test_config(state.path(), root.path()));
    let mut events = service.subscribe();
    service.start().unwrap();

    // New file appears after startup.
    let path = write_log(
        root.path(),
        "2025/01/01",
        "run-2025-01-01T00-00-00-abc.log",
        &basic_log_lines(),
    );
    wait_for(&mut events, |event| {
        matches!(event, IndexEvent::Added(batch) if batch.iter().any(|s| s.id == "abc"))
    })
    .await;

    // Append a new record; the summary refreshes.
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("\n{\"type\":\"message\",\"role\":\"user\",\"content\":\"more\"}");
    std::fs::write(&path, content).unwrap();
    wait_for(&mut events, |event| {
        matches!(event, IndexEvent::Updated(summary) if summary.id == "abc")
    })
    .await;

    // Unlink propagates as a removal.
    std::fs::remove_file(&path).unwrap();
    wait_for(&mut events, |event| matches!(event, IndexEvent::Removed(_))).await;

    service.stop();
}
