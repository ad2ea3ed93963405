//! Incremental analysis cache
//!
//! Snapshots are memoized per `(uri, version)`. Concurrent misses for the same
//! key share one analyzer run; the run is cancelled once every caller waiting
//! on it has gone away. Observing a newer version of a document evicts every
//! older entry for that document, and requests for versions older than the
//! newest one seen are computed without being stored.

use crate::cancel::CancellationToken;
use lsp_types::Url;
use pyrite_analyzer::{analyze_with, AnalysisOptions, AnalysisSnapshot, Cancelled};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, warn};

type SlotKey = (Url, i32);
type SnapshotTx = watch::Sender<Option<Arc<AnalysisSnapshot>>>;
type SnapshotRx = watch::Receiver<Option<Arc<AnalysisSnapshot>>>;

/// Counters exposed for tests and logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// Analyzer invocations, cached or not
    pub computations: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    computations: AtomicU64,
    evictions: AtomicU64,
}

enum Slot {
    Ready(Arc<AnalysisSnapshot>),
    Pending(Pending),
}

struct Pending {
    /// Distinguishes this computation from a later one for the same key
    id: u64,
    rx: SnapshotRx,
    token: CancellationToken,
    waiters: usize,
}

#[derive(Default)]
struct CacheState {
    /// Newest version observed per document
    newest: HashMap<Url, i32>,
    slots: HashMap<SlotKey, Slot>,
    next_id: u64,
}

impl CacheState {
    /// Drop every slot of `uri` matching `stale`; pending runs are cancelled
    fn evict(&mut self, uri: &Url, stale: impl Fn(i32) -> bool) -> u64 {
        let keys: Vec<SlotKey> = self
            .slots
            .keys()
            .filter(|(slot_uri, version)| slot_uri == uri && stale(*version))
            .cloned()
            .collect();
        for key in &keys {
            if let Some(Slot::Pending(pending)) = self.slots.remove(key) {
                pending.token.cancel();
            }
        }
        keys.len() as u64
    }

    fn remove_pending(&mut self, key: &SlotKey, id: u64) {
        if matches!(self.slots.get(key), Some(Slot::Pending(p)) if p.id == id) {
            self.slots.remove(key);
        }
    }
}

enum Lookup {
    Hit(Arc<AnalysisSnapshot>),
    Uncached,
    Wait { rx: SnapshotRx, id: u64 },
    Start { tx: SnapshotTx, rx: SnapshotRx, token: CancellationToken, id: u64 },
}

/// Incremental analysis cache
pub struct AnalysisCache {
    state: Arc<Mutex<CacheState>>,
    workers: Arc<Semaphore>,
    options: RwLock<Arc<AnalysisOptions>>,
    counters: Arc<Counters>,
}

impl AnalysisCache {
    /// Cache running at most `workers` analyses at a time
    pub fn new(workers: usize, options: AnalysisOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            workers: Arc::new(Semaphore::new(workers.max(1))),
            options: RwLock::new(Arc::new(options)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Snapshot of `text` at `(uri, version)`, analyzing on a miss.
    ///
    /// Returns `Cancelled` only when `cancel` fires before a snapshot is ready.
    pub async fn get_or_compute(
        &self,
        uri: &Url,
        version: i32,
        text: Arc<str>,
        cancel: &CancellationToken,
    ) -> Result<Arc<AnalysisSnapshot>, Cancelled> {
        let key = (uri.clone(), version);

        let (rx, id) = match self.lookup(&key) {
            Lookup::Hit(snapshot) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(snapshot);
            }
            Lookup::Uncached => {
                debug!(%uri, version, "stale version, computing uncached");
                return self.compute_uncached(uri, version, text, cancel).await;
            }
            Lookup::Wait { rx, id } => (rx, id),
            Lookup::Start { tx, rx, token, id } => {
                self.spawn_computation(key.clone(), id, text.clone(), tx, token);
                (rx, id)
            }
        };

        let guard = WaiterGuard {
            state: self.state.clone(),
            key,
            id,
        };
        let shared = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled),
            shared = wait_ready(rx) => shared,
        };
        drop(guard);

        match shared {
            Some(snapshot) => Ok(snapshot),
            // the shared run was evicted or cancelled under us
            None => self.compute_uncached(uri, version, text, cancel).await,
        }
    }

    fn lookup(&self, key: &SlotKey) -> Lookup {
        let (uri, version) = (&key.0, key.1);
        let mut state = self.lock();

        match state.newest.get(uri).copied() {
            Some(newest) if version < newest => return Lookup::Uncached,
            Some(newest) if version == newest => {}
            _ => {
                state.newest.insert(uri.clone(), version);
                let evicted = state.evict(uri, |v| v < version);
                if evicted > 0 {
                    debug!(%uri, version, evicted, "evicted older versions");
                    self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
                }
            }
        }

        if let Some(slot) = state.slots.get_mut(key) {
            return match slot {
                Slot::Ready(snapshot) => Lookup::Hit(snapshot.clone()),
                Slot::Pending(pending) => {
                    pending.waiters += 1;
                    Lookup::Wait {
                        rx: pending.rx.clone(),
                        id: pending.id,
                    }
                }
            };
        }

        let id = state.next_id;
        state.next_id += 1;
        let (tx, rx) = watch::channel(None);
        let token = CancellationToken::new();
        state.slots.insert(
            key.clone(),
            Slot::Pending(Pending {
                id,
                rx: rx.clone(),
                token: token.clone(),
                waiters: 1,
            }),
        );
        Lookup::Start { tx, rx, token, id }
    }

    fn spawn_computation(
        &self,
        key: SlotKey,
        id: u64,
        text: Arc<str>,
        tx: SnapshotTx,
        token: CancellationToken,
    ) {
        let state = self.state.clone();
        let workers = self.workers.clone();
        let options = self.options();
        let counters = self.counters.clone();

        tokio::spawn(async move {
            let outcome =
                run_analysis(&workers, &counters, &key.0, key.1, text, options, token).await;
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            match outcome {
                Ok(snapshot) => {
                    if matches!(state.slots.get(&key), Some(Slot::Pending(p)) if p.id == id) {
                        state.slots.insert(key, Slot::Ready(snapshot.clone()));
                    }
                    drop(state);
                    // no receivers left is fine
                    let _ = tx.send(Some(snapshot));
                }
                Err(Cancelled) => {
                    debug!(uri = %key.0, version = key.1, "analysis cancelled");
                    state.remove_pending(&key, id);
                }
            }
        });
    }

    async fn compute_uncached(
        &self,
        uri: &Url,
        version: i32,
        text: Arc<str>,
        cancel: &CancellationToken,
    ) -> Result<Arc<AnalysisSnapshot>, Cancelled> {
        run_analysis(
            &self.workers,
            &self.counters,
            uri,
            version,
            text,
            self.options(),
            cancel.clone(),
        )
        .await
    }

    /// Drop every entry of `uri`, cancelling its pending runs
    pub fn evict_document(&self, uri: &Url) {
        let mut state = self.lock();
        state.newest.remove(uri);
        let evicted = state.evict(uri, |_| true);
        self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
    }

    /// Replace the analysis policy; all cached snapshots are dropped
    pub fn set_options(&self, options: AnalysisOptions) {
        *self.options.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(options);
        let mut state = self.lock();
        for (_, slot) in state.slots.drain() {
            if let Slot::Pending(pending) = slot {
                pending.token.cancel();
            }
        }
    }

    pub fn options(&self) -> Arc<AnalysisOptions> {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a finished snapshot is stored for `(uri, version)`
    pub fn contains(&self, uri: &Url, version: i32) -> bool {
        matches!(
            self.lock().slots.get(&(uri.clone(), version)),
            Some(Slot::Ready(_))
        )
    }

    /// Semaphore bounding concurrent analyses
    pub fn workers(&self) -> &Arc<Semaphore> {
        &self.workers
    }

    /// Number of computations still running or queued
    pub fn pending(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Pending(_)))
            .count()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            computations: self.counters.computations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements the waiter count of a pending slot; the last one out cancels it
struct WaiterGuard {
    state: Arc<Mutex<CacheState>>,
    key: SlotKey,
    id: u64,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let abandoned = match state.slots.get_mut(&self.key) {
            Some(Slot::Pending(pending)) if pending.id == self.id => {
                pending.waiters = pending.waiters.saturating_sub(1);
                if pending.waiters == 0 {
                    pending.token.cancel();
                    true
                } else {
                    false
                }
            }
            _ => false,
        };
        if abandoned {
            debug!(
                uri = %self.key.0,
                version = self.key.1,
                "all waiters gone, cancelling analysis"
            );
            state.slots.remove(&self.key);
        }
    }
}

async fn wait_ready(mut rx: SnapshotRx) -> Option<Arc<AnalysisSnapshot>> {
    let ready = match rx.wait_for(Option::is_some).await {
        Ok(value) => value.clone(),
        Err(_) => None,
    };
    ready
}

/// Run the analyzer on the blocking pool under a worker permit
async fn run_analysis(
    workers: &Arc<Semaphore>,
    counters: &Counters,
    uri: &Url,
    version: i32,
    text: Arc<str>,
    options: Arc<AnalysisOptions>,
    token: CancellationToken,
) -> Result<Arc<AnalysisSnapshot>, Cancelled> {
    let permit = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(Cancelled),
        permit = workers.clone().acquire_owned() => permit.map_err(|_| Cancelled)?,
    };

    counters.computations.fetch_add(1, Ordering::Relaxed);
    let uri_string = uri.to_string();
    let joined = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        analyze_with(&uri_string, &text, version, &options, &|| token.is_cancelled())
    })
    .await;

    match joined {
        Ok(result) => result.map(Arc::new),
        Err(error) => {
            warn!(%uri, version, "analysis task failed: {}", error);
            Err(Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrite_analyzer::Severity;

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///workspace/{}", name)).unwrap()
    }

    fn text(source: &str) -> Arc<str> {
        Arc::from(source)
    }

    #[tokio::test]
    async fn test_hit_returns_same_snapshot() {
        let cache = AnalysisCache::new(2, AnalysisOptions::default());
        let token = CancellationToken::new();

        let first = cache.get_or_compute(&uri("a.py"), 1, text("x = 1\n"), &token).await.unwrap();
        let second = cache.get_or_compute(&uri("a.py"), 1, text("x = 1\n"), &token).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().computations, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_newer_version_evicts_older() {
        let cache = AnalysisCache::new(2, AnalysisOptions::default());
        let token = CancellationToken::new();
        let a = uri("a.py");

        cache.get_or_compute(&a, 1, text("x = 1\n"), &token).await.unwrap();
        cache.get_or_compute(&uri("b.py"), 1, text("y = 1\n"), &token).await.unwrap();
        cache.get_or_compute(&a, 2, text("x = 2\n"), &token).await.unwrap();

        assert!(!cache.contains(&a, 1));
        assert!(cache.contains(&a, 2));
        assert!(cache.contains(&uri("b.py"), 1));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_stale_request_is_not_stored() {
        let cache = AnalysisCache::new(2, AnalysisOptions::default());
        let token = CancellationToken::new();
        let a = uri("a.py");

        cache.get_or_compute(&a, 3, text("x = 3\n"), &token).await.unwrap();
        let stale = cache.get_or_compute(&a, 2, text("x = 2\n"), &token).await.unwrap();

        assert_eq!(stale.version, 2);
        assert!(!cache.contains(&a, 2));
        assert!(cache.contains(&a, 3));
    }

    #[tokio::test]
    async fn test_cancelled_caller_leaves_no_slot() {
        let cache = AnalysisCache::new(1, AnalysisOptions::default());
        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let a = uri("a.py");

        let result = cache.get_or_compute(&a, 1, text("x = 1\n"), &cancelled).await;
        assert_eq!(result.unwrap_err(), Cancelled);
        assert!(!cache.contains(&a, 1));
        assert_eq!(cache.pending(), 0);

        let live = CancellationToken::new();
        let snapshot = cache.get_or_compute(&a, 1, text("x = 1\n"), &live).await.unwrap();
        assert_eq!(snapshot.version, 1);
        assert!(cache.contains(&a, 1));
    }

    #[tokio::test]
    async fn test_set_options_invalidates() {
        let cache = AnalysisCache::new(1, AnalysisOptions::default());
        let token = CancellationToken::new();
        let a = uri("a.py");

        let before = cache.get_or_compute(&a, 1, text("print(missing)\n"), &token).await.unwrap();
        assert_eq!(before.diagnostics[0].severity, Severity::Hint);

        cache.set_options(AnalysisOptions {
            unresolved_severity: Severity::Warning,
            ..AnalysisOptions::default()
        });
        assert!(!cache.contains(&a, 1));

        let after = cache.get_or_compute(&a, 1, text("print(missing)\n"), &token).await.unwrap();
        assert_eq!(after.diagnostics[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_evict_document() {
        let cache = AnalysisCache::new(1, AnalysisOptions::default());
        let token = CancellationToken::new();
        let a = uri("a.py");

        cache.get_or_compute(&a, 5, text(""), &token).await.unwrap();
        cache.evict_document(&a);
        assert!(!cache.contains(&a, 5));

        // after close, a reopened document may start over at a lower version
        cache.get_or_compute(&a, 1, text(""), &token).await.unwrap();
        assert!(cache.contains(&a, 1));
    }
}
