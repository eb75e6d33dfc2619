use anyhow::Result;
use logbook_core::{CanonicalKey, signature_of};
use logbook_parser::parse_summary;
use logbook_types::Summary;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::retry;
use crate::service::ServiceInner;

/// What one pass over a single file did to the tables.
pub(crate) enum RefreshOutcome {
    /// Signature matched the cached entry; nothing re-parsed.
    Unchanged,
    /// First successful parse for this key.
    Added(Summary),
    /// Existing entry re-parsed after a signature mismatch (or forced).
    Updated(Summary),
    /// File gone; both entries pruned.
    Removed(PathBuf),
    /// File gone and nothing was cached for it.
    Missing,
}

/// The per-file pipeline: signature-check, then parse, then publish into the
/// summary tier. Serialized per canonical key; the detail tier entry is
/// invalidated on change and re-parsed lazily by `get_details`.
///
/// `force` bypasses the signature gate — used by the retry scheduler, whose
/// whole point is re-parsing an unchanged file with the deeper scan.
pub(crate) async fn refresh_path(
    inner: &Arc<ServiceInner>,
    path: &Path,
    force: bool,
) -> Result<RefreshOutcome> {
    let key = CanonicalKey::from_path(path);
    let _guard = inner.locks.acquire(&key).await;

    let stat_path = path.to_path_buf();
    let sig = tokio::task::spawn_blocking(move || signature_of(&stat_path)).await??;
    let Some(sig) = sig else {
        inner.retries.lock().expect("retry map poisoned").remove(&key);
        let existed = {
            let mut tables = inner.tables.write().expect("tables poisoned");
            let had_summary = tables.summaries.remove(&key).is_some();
            let had_details = tables.details.remove(&key).is_some();
            had_summary || had_details
        };
        return Ok(if existed {
            RefreshOutcome::Removed(path.to_path_buf())
        } else {
            RefreshOutcome::Missing
        });
    };

    let (fresh, existed) = {
        let tables = inner.tables.read().expect("tables poisoned");
        (
            tables.summaries.get_if_fresh(&key, sig).is_some(),
            tables.summaries.contains(&key),
        )
    };
    if fresh && !force {
        return Ok(RefreshOutcome::Unchanged);
    }

    let parse_path = path.to_path_buf();
    let options = inner.config.parse.clone();
    let summary =
        tokio::task::spawn_blocking(move || parse_summary(&parse_path, &options)).await??;

    {
        let mut tables = inner.tables.write().expect("tables poisoned");
        tables
            .summaries
            .insert(key.clone(), sig, summary.clone());
        // The cached full parse no longer matches the file.
        tables.details.remove(&key);
    }

    retry::check_retry(inner, &key, path, &summary);

    Ok(if existed {
        RefreshOutcome::Updated(summary)
    } else {
        RefreshOutcome::Added(summary)
    })
}

/// Snapshot the requested tiers to disk off the async path. Save failures
/// are logged, never propagated; the in-memory tables stay authoritative.
pub(crate) async fn persist(inner: &Arc<ServiceInner>, summaries: bool, details: bool) {
    let (summary_table, detail_table) = {
        let tables = inner.tables.read().expect("tables poisoned");
        (
            summaries.then(|| tables.summaries.clone()),
            details.then(|| tables.details.clone()),
        )
    };

    let store = inner.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        if let Some(table) = summary_table
            && let Err(err) = store.save_summaries(&table)
        {
            tracing::warn!(%err, "failed to save summary table");
        }
        if let Some(table) = detail_table
            && let Err(err) = store.save_details(&table)
        {
            tracing::warn!(%err, "failed to save detail table");
        }
    })
    .await;

    if let Err(err) = result {
        tracing::warn!(%err, "cache save task failed");
    }
}
