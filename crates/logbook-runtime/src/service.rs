use anyhow::Result;
use logbook_core::{CanonicalKey, signature_of};
use logbook_parser::{ParseOptions, parse_details};
use logbook_store::{CacheStore, DetailTable, SummaryTable};
use logbook_types::{Details, Summary};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::crawler::{self, CrawlStats};
use crate::events::IndexEvent;
use crate::keyed::{KeyLocks, KeyedDelay};
use crate::refresh;
use crate::rescan;
use crate::retry;
use crate::watcher::{self, RootWatcher};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Tuning for one service instance. Defaults match production behavior;
/// tests shrink the timing knobs.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub state_dir: PathBuf,
    pub roots: Vec<PathBuf>,
    /// Fixed width of the crawl concurrency limiter.
    pub crawl_width: usize,
    /// How many `Added` summaries accumulate before a notice goes out.
    pub added_batch_size: usize,
    pub parse: ParseOptions,
    /// Backoff schedule for provisional-key re-parses; length is the cap.
    pub retry_backoff: Vec<Duration>,
    pub rescan_interval: Duration,
    /// How many of the most recent day partitions the rescan re-lists.
    pub rescan_partitions: usize,
    pub local_debounce: Duration,
    pub remote_debounce: Duration,
    pub remote_poll_interval: Duration,
}

impl ServiceConfig {
    pub fn new(state_dir: impl Into<PathBuf>, roots: Vec<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            roots,
            crawl_width: 8,
            added_batch_size: 50,
            parse: ParseOptions::default(),
            retry_backoff: vec![
                Duration::from_millis(2500),
                Duration::from_millis(6000),
                Duration::from_millis(12000),
            ],
            rescan_interval: Duration::from_secs(5),
            rescan_partitions: 2,
            local_debounce: Duration::from_millis(300),
            remote_debounce: Duration::from_millis(1000),
            remote_poll_interval: Duration::from_secs(2),
        }
    }
}

pub(crate) struct Tables {
    pub summaries: SummaryTable,
    pub details: DetailTable,
}

pub(crate) struct ServiceInner {
    pub config: ServiceConfig,
    pub store: CacheStore,
    pub tables: RwLock<Tables>,
    pub events: broadcast::Sender<IndexEvent>,
    pub locks: KeyLocks,
    pub delays: KeyedDelay,
    pub retries: Mutex<HashMap<CanonicalKey, usize>>,
}

impl ServiceInner {
    pub fn emit(&self, event: IndexEvent) {
        let _ = self.events.send(event);
    }
}

struct Running {
    tasks: Vec<JoinHandle<()>>,
    watchers: Vec<RootWatcher>,
}

/// Facade over the two in-memory tables and the crawl/watch/retry pipeline
/// that feeds them.
///
/// Reads are non-blocking against the in-memory tables; writes happen only
/// through the pipeline (plus the lazy detail parse on `get_details`). Start
/// and stop are idempotent; stop cancels every watcher subscription, the
/// rescan timer and all pending per-key timers, and a stopped service can be
/// started again.
pub struct SessionIndexService {
    inner: Arc<ServiceInner>,
    running: Mutex<Option<Running>>,
}

impl SessionIndexService {
    /// Load both cache tiers and materialize them. Corrupt snapshots load
    /// as empty tables; this never fails on cache state.
    pub fn open(config: ServiceConfig) -> Self {
        let store = CacheStore::new(&config.state_dir);
        let tables = Tables {
            summaries: store.load_summaries(),
            details: store.load_details(),
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(ServiceInner {
                config,
                store,
                tables: RwLock::new(tables),
                events,
                locks: KeyLocks::default(),
                delays: KeyedDelay::default(),
                retries: Mutex::new(HashMap::new()),
            }),
            running: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.inner.events.subscribe()
    }

    /// All known summaries, newest first. In-memory sort, no I/O.
    pub fn list_summaries(&self) -> Vec<Summary> {
        let tables = self.inner.tables.read().expect("tables poisoned");
        let mut summaries: Vec<Summary> = tables.summaries.summaries().cloned().collect();
        summaries.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        summaries
    }

    /// Full parsed detail for one session file.
    ///
    /// Returns the cached parse iff its signature matches the live file;
    /// otherwise re-parses and refreshes both tiers. Returns `None` (and
    /// prunes any stale entries) when the file is gone — a deleted file is
    /// never served from cache.
    pub async fn get_details(&self, path: &Path) -> Result<Option<Details>> {
        let inner = &self.inner;
        let key = CanonicalKey::from_path(path);
        let _guard = inner.locks.acquire(&key).await;

        let stat_path = path.to_path_buf();
        let sig = tokio::task::spawn_blocking(move || signature_of(&stat_path)).await??;
        let Some(sig) = sig else {
            let existed = {
                let mut tables = inner.tables.write().expect("tables poisoned");
                let had_summary = tables.summaries.remove(&key).is_some();
                let had_details = tables.details.remove(&key).is_some();
                had_summary || had_details
            };
            if existed {
                refresh::persist(inner, true, true).await;
                inner.emit(IndexEvent::Removed(path.to_path_buf()));
            }
            return Ok(None);
        };

        {
            let tables = inner.tables.read().expect("tables poisoned");
            if let Some(details) = tables.details.get_if_fresh(&key, sig) {
                return Ok(Some(details.clone()));
            }
        }

        let parse_path = path.to_path_buf();
        let details = tokio::task::spawn_blocking(move || parse_details(&parse_path)).await??;
        let summary = details.to_summary(path.to_path_buf());
        {
            let mut tables = inner.tables.write().expect("tables poisoned");
            tables.details.insert(key.clone(), sig, details.clone());
            tables.summaries.insert(key.clone(), sig, summary.clone());
        }
        retry::check_retry(inner, &key, path, &summary);
        refresh::persist(inner, true, true).await;

        Ok(Some(details))
    }

    /// External deletion hook: purge both tiers and persist.
    pub async fn remove_file(&self, path: &Path) -> Result<()> {
        let inner = &self.inner;
        let key = CanonicalKey::from_path(path);
        let _guard = inner.locks.acquire(&key).await;

        inner.delays.cancel(&key);
        inner.retries.lock().expect("retry map poisoned").remove(&key);

        let existed = {
            let mut tables = inner.tables.write().expect("tables poisoned");
            let had_summary = tables.summaries.remove(&key).is_some();
            let had_details = tables.details.remove(&key).is_some();
            had_summary || had_details
        };

        if existed {
            refresh::persist(inner, true, true).await;
            inner.emit(IndexEvent::Removed(path.to_path_buf()));
        }

        Ok(())
    }

    /// One full pass over every root. Also run automatically by `start`.
    pub async fn crawl_once(&self) -> CrawlStats {
        crawler::crawl(Arc::clone(&self.inner)).await
    }

    /// Spawn the watcher subscriptions, the periodic rescan and the initial
    /// crawl. Idempotent: a running service ignores further starts.
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock().expect("running state poisoned");
        if running.is_some() {
            return Ok(());
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watchers = Vec::new();
        for root in &self.inner.config.roots {
            if !root.exists() {
                continue;
            }
            match watcher::create_root_watcher(root, &self.inner.config, tx.clone()) {
                Ok(root_watcher) => watchers.push(root_watcher),
                Err(err) => tracing::warn!(
                    root = %root.display(),
                    %err,
                    "watcher init failed, relying on periodic rescan"
                ),
            }
        }

        let tasks = vec![
            watcher::spawn_dispatch(Arc::clone(&self.inner), rx),
            rescan::spawn_rescan(Arc::clone(&self.inner)),
            {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    crawler::crawl(inner).await;
                })
            },
        ];

        *running = Some(Running { tasks, watchers });
        Ok(())
    }

    /// Tear down every background task, watcher subscription and pending
    /// timer. Idempotent; `start` may be called again afterwards.
    pub fn stop(&self) {
        let mut running = self.running.lock().expect("running state poisoned");
        if let Some(running) = running.take() {
            for task in running.tasks {
                task.abort();
            }
            drop(running.watchers);
            self.inner.delays.cancel_all();
            self.inner
                .retries
                .lock()
                .expect("retry map poisoned")
                .clear();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .expect("running state poisoned")
            .is_some()
    }

    /// Files currently tracked by the retry scheduler.
    pub fn pending_retries(&self) -> usize {
        self.inner
            .retries
            .lock()
            .expect("retry map poisoned")
            .len()
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.inner
            .tables
            .read()
            .expect("tables poisoned")
            .summaries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for SessionIndexService {
    fn drop(&mut self) {
        self.stop();
    }
}
