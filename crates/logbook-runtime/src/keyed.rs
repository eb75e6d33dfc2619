use futures::future::BoxFuture;
use logbook_core::CanonicalKey;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;

/// Per-key serialization for the signature-check → parse → publish pipeline.
///
/// No two concurrent parses of the same file may race; everything that
/// touches one canonical key's table entries acquires this first.
#[derive(Default)]
pub(crate) struct KeyLocks {
    inner: Mutex<HashMap<CanonicalKey, std::sync::Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyLocks {
    pub async fn acquire(&self, key: &CanonicalKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("key lock map poisoned");
            map.entry(key.clone())
                .or_insert_with(|| std::sync::Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Cancelable delayed task per canonical key.
///
/// Shared by the retry scheduler (backoff re-parses) and the watcher's
/// stability window (debounce): scheduling a key replaces whatever was
/// pending for it, and `cancel_all` covers service shutdown.
#[derive(Default)]
pub(crate) struct KeyedDelay {
    tasks: Mutex<HashMap<CanonicalKey, JoinHandle<()>>>,
}

impl KeyedDelay {
    pub fn schedule(&self, key: CanonicalKey, delay: Duration, work: BoxFuture<'static, ()>) {
        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            work.await;
        });

        let mut map = self.tasks.lock().expect("delay map poisoned");
        if let Some(previous) = map.insert(key, handle) {
            // A delayed task rescheduling its own key must not abort itself.
            if tokio::task::try_id() != Some(previous.id()) {
                previous.abort();
            }
        }
    }

    pub fn cancel(&self, key: &CanonicalKey) {
        if let Some(handle) = self.tasks.lock().expect("delay map poisoned").remove(key) {
            handle.abort();
        }
    }

    pub fn cancel_all(&self) {
        let handles: Vec<_> = {
            let mut map = self.tasks.lock().expect("delay map poisoned");
            map.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn rescheduling_a_key_cancels_the_pending_task() {
        let delays = KeyedDelay::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = CanonicalKey::from_normalized("/logs/run-a.log");

        let first = Arc::clone(&counter);
        delays.schedule(
            key.clone(),
            Duration::from_millis(30),
            Box::pin(async move {
                first.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let second = Arc::clone(&counter);
        delays.schedule(
            key,
            Duration::from_millis(30),
            Box::pin(async move {
                second.fetch_add(10, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn cancel_all_stops_pending_work() {
        let delays = KeyedDelay::default();
        let counter = Arc::new(AtomicUsize::new(0));

        for i in 0..4 {
            let counter = Arc::clone(&counter);
            delays.schedule(
                CanonicalKey::from_normalized(format!("/logs/run-{i}.log")),
                Duration::from_millis(30),
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        delays.cancel_all();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
