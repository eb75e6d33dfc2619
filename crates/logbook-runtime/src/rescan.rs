use logbook_core::{list_log_files, recent_partition_dirs};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::service::ServiceInner;
use crate::watcher;

/// Safety net against missed watcher events: periodically re-list only the
/// most recent date partitions per root and apply update-if-changed. The
/// signature gate makes an idle tick close to free.
pub(crate) fn spawn_rescan(inner: Arc<ServiceInner>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(inner.config.rescan_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The initial crawl covers startup; skip the immediate first tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_rescan(&inner).await;
        }
    })
}

pub(crate) async fn run_rescan(inner: &Arc<ServiceInner>) {
    let roots = inner.config.roots.clone();
    let partitions = inner.config.rescan_partitions;
    let files: Vec<PathBuf> = tokio::task::spawn_blocking(move || {
        roots
            .iter()
            .flat_map(|root| recent_partition_dirs(root, partitions))
            .flat_map(|day_dir| list_log_files(&day_dir))
            .collect()
    })
    .await
    .unwrap_or_default();

    for path in files {
        watcher::apply_change(inner, &path).await;
    }
}
