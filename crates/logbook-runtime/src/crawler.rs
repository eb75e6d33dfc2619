use futures::StreamExt;
use logbook_core::{CanonicalKey, list_partition_files};
use logbook_types::Summary;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::events::IndexEvent;
use crate::refresh::{self, RefreshOutcome};
use crate::service::ServiceInner;

/// Accounting for one crawl pass. `parsed` counts actual re-parses; an
/// unchanged tree crawls with `parsed == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub scanned: usize,
    pub parsed: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Walk every root's date partitions and push each candidate through the
/// refresh pipeline, gated by the fixed-width limiter. `Added` notices go
/// out in batches; per-task failures are logged and the crawl continues.
pub(crate) async fn crawl(inner: Arc<ServiceInner>) -> CrawlStats {
    let roots = inner.config.roots.clone();
    let candidates: Vec<PathBuf> = tokio::task::spawn_blocking(move || {
        roots
            .iter()
            .flat_map(|root| list_partition_files(root))
            .collect()
    })
    .await
    .unwrap_or_default();

    let stats = Mutex::new(CrawlStats {
        scanned: candidates.len(),
        ..CrawlStats::default()
    });
    let batch: Mutex<Vec<Summary>> = Mutex::new(Vec::new());

    futures::stream::iter(candidates.clone())
        .for_each_concurrent(inner.config.crawl_width, |path| {
            let inner = Arc::clone(&inner);
            let stats = &stats;
            let batch = &batch;
            async move {
                match refresh::refresh_path(&inner, &path, false).await {
                    Ok(RefreshOutcome::Added(summary)) => {
                        {
                            let mut stats = stats.lock().expect("crawl stats poisoned");
                            stats.parsed += 1;
                            stats.added += 1;
                        }
                        let full = {
                            let mut batch = batch.lock().expect("crawl batch poisoned");
                            batch.push(summary);
                            (batch.len() >= inner.config.added_batch_size)
                                .then(|| std::mem::take(&mut *batch))
                        };
                        if let Some(full) = full {
                            inner.emit(IndexEvent::Added(full));
                        }
                    }
                    Ok(RefreshOutcome::Updated(summary)) => {
                        {
                            let mut stats = stats.lock().expect("crawl stats poisoned");
                            stats.parsed += 1;
                            stats.updated += 1;
                        }
                        inner.emit(IndexEvent::Updated(summary));
                    }
                    Ok(RefreshOutcome::Removed(path)) => {
                        stats.lock().expect("crawl stats poisoned").removed += 1;
                        inner.emit(IndexEvent::Removed(path));
                    }
                    Ok(RefreshOutcome::Unchanged) | Ok(RefreshOutcome::Missing) => {}
                    Err(err) => {
                        tracing::warn!(path = %path.display(), %err, "scan task failed");
                    }
                }
            }
        })
        .await;

    let trailing = std::mem::take(&mut *batch.lock().expect("crawl batch poisoned"));
    if !trailing.is_empty() {
        inner.emit(IndexEvent::Added(trailing));
    }

    let pruned = prune_vanished(&inner, &candidates).await;

    let mut stats = stats.into_inner().expect("crawl stats poisoned");
    stats.removed += pruned;

    refresh::persist(&inner, true, stats.removed > 0).await;
    stats
}

/// Entries whose files were deleted while the service was not watching do
/// not show up as crawl candidates; stat them directly and prune the ones
/// that are confirmed gone.
async fn prune_vanished(inner: &Arc<ServiceInner>, candidates: &[PathBuf]) -> usize {
    let candidate_keys: HashSet<CanonicalKey> = candidates
        .iter()
        .map(|path| CanonicalKey::from_path(path))
        .collect();

    let stale: Vec<PathBuf> = {
        let tables = inner.tables.read().expect("tables poisoned");
        tables
            .summaries
            .entries()
            .filter(|(key, _)| !candidate_keys.contains(key))
            .map(|(_, cached)| cached.summary.file_path.clone())
            .collect()
    };

    let mut removed = 0;
    for path in stale {
        match refresh::refresh_path(inner, &path, false).await {
            Ok(RefreshOutcome::Removed(path)) => {
                removed += 1;
                inner.emit(IndexEvent::Removed(path));
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "prune check failed");
            }
        }
    }
    removed
}
