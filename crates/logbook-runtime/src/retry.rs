use logbook_core::{CanonicalKey, project_key_from_dir};
use logbook_types::Summary;
use std::path::Path;
use std::sync::Arc;

use crate::events::IndexEvent;
use crate::refresh::{self, RefreshOutcome};
use crate::service::ServiceInner;

/// Decide whether a freshly parsed file needs a delayed re-parse.
///
/// Writers append the working-directory metadata after the header, so a
/// file observed too early groups under its own containing directory. While
/// the key is still provisional, schedule another parse with backoff; after
/// the schedule is exhausted the file keeps its provisional key and the
/// retry state is cleared.
pub(crate) fn check_retry(
    inner: &Arc<ServiceInner>,
    key: &CanonicalKey,
    path: &Path,
    summary: &Summary,
) {
    let provisional = project_key_from_dir(path);
    if summary.project_key != provisional {
        // Authoritative: nothing left to promote.
        inner
            .retries
            .lock()
            .expect("retry map poisoned")
            .remove(key);
        return;
    }

    let attempt = {
        let mut retries = inner.retries.lock().expect("retry map poisoned");
        let attempt = *retries.get(key).unwrap_or(&0);
        if attempt >= inner.config.retry_backoff.len() {
            retries.remove(key);
            return;
        }
        retries.insert(key.clone(), attempt + 1);
        attempt
    };

    let delay = inner.config.retry_backoff[attempt];
    let task_inner = Arc::clone(inner);
    let task_path = path.to_path_buf();
    inner.delays.schedule(
        key.clone(),
        delay,
        Box::pin(async move {
            run_scheduled_retry(task_inner, task_path).await;
        }),
    );
}

async fn run_scheduled_retry(inner: Arc<ServiceInner>, path: std::path::PathBuf) {
    let provisional = project_key_from_dir(&path);
    match refresh::refresh_path(&inner, &path, true).await {
        Ok(RefreshOutcome::Updated(summary)) | Ok(RefreshOutcome::Added(summary)) => {
            if summary.project_key != provisional {
                inner.emit(IndexEvent::Updated(summary));
                refresh::persist(&inner, true, false).await;
            }
        }
        Ok(RefreshOutcome::Removed(gone)) => {
            inner.emit(IndexEvent::Removed(gone));
            refresh::persist(&inner, true, true).await;
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "scheduled re-parse failed");
        }
    }
}
