use logbook_core::{CanonicalKey, LOG_SUFFIX, MountKind, classify_mount};
use notify::{Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::events::IndexEvent;
use crate::refresh::{self, RefreshOutcome};
use crate::service::{ServiceConfig, ServiceInner};

/// One change notification from a root watcher, with the stability window
/// appropriate for that root's mount kind. Deletions carry a zero delay.
pub(crate) struct FsEvent {
    pub path: PathBuf,
    pub debounce: Duration,
}

/// Keeps one root's notify subscription alive. Dropping it unsubscribes.
pub(crate) enum RootWatcher {
    Recommended(#[allow(dead_code)] RecommendedWatcher),
    Poll(#[allow(dead_code)] PollWatcher),
}

/// Event-driven watching for local mounts; stability-windowed polling for
/// remote-style mounts, where native change events are known unreliable.
pub(crate) fn create_root_watcher(
    root: &Path,
    config: &ServiceConfig,
    tx: UnboundedSender<FsEvent>,
) -> notify::Result<RootWatcher> {
    match classify_mount(root) {
        MountKind::Local => {
            let mut watcher =
                RecommendedWatcher::new(make_handler(tx, config.local_debounce), notify::Config::default())?;
            watcher.watch(root, RecursiveMode::Recursive)?;
            Ok(RootWatcher::Recommended(watcher))
        }
        MountKind::Remote => {
            let poll_config =
                notify::Config::default().with_poll_interval(config.remote_poll_interval);
            let mut watcher =
                PollWatcher::new(make_handler(tx, config.remote_debounce), poll_config)?;
            watcher.watch(root, RecursiveMode::Recursive)?;
            Ok(RootWatcher::Poll(watcher))
        }
    }
}

fn make_handler(
    tx: UnboundedSender<FsEvent>,
    debounce: Duration,
) -> impl Fn(notify::Result<Event>) + Send + 'static {
    move |result| {
        let Ok(event) = result else { return };
        let delay = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => debounce,
            EventKind::Remove(_) => Duration::ZERO,
            _ => return,
        };
        for path in event.paths {
            if path.extension().is_some_and(|ext| ext == LOG_SUFFIX) {
                let _ = tx.send(FsEvent {
                    path,
                    debounce: delay,
                });
            }
        }
    }
}

/// Funnel watcher notifications into per-key debounced refreshes. The
/// debounce shares the retry scheduler's keyed timer map, so a burst of
/// writes settles to one parse.
pub(crate) fn spawn_dispatch(
    inner: Arc<ServiceInner>,
    mut rx: UnboundedReceiver<FsEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(FsEvent { path, debounce }) = rx.recv().await {
            let key = CanonicalKey::from_path(&path);
            let task_inner = Arc::clone(&inner);
            inner.delays.schedule(
                key,
                debounce,
                Box::pin(async move {
                    apply_change(&task_inner, &path).await;
                }),
            );
        }
    })
}

/// Shared add/change/unlink handling for watcher events and the periodic
/// rescan: refresh, notify, persist.
pub(crate) async fn apply_change(inner: &Arc<ServiceInner>, path: &Path) {
    match refresh::refresh_path(inner, path, false).await {
        Ok(RefreshOutcome::Added(summary)) => {
            inner.emit(IndexEvent::Added(vec![summary]));
            refresh::persist(inner, true, false).await;
        }
        Ok(RefreshOutcome::Updated(summary)) => {
            inner.emit(IndexEvent::Updated(summary));
            refresh::persist(inner, true, false).await;
        }
        Ok(RefreshOutcome::Removed(path)) => {
            inner.emit(IndexEvent::Removed(path));
            refresh::persist(inner, true, true).await;
        }
        Ok(RefreshOutcome::Unchanged) | Ok(RefreshOutcome::Missing) => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "change handling failed");
        }
    }
}
