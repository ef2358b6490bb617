// src/cache.rs
//! Snapshot cache over the dataset sheet and the loader that refreshes it
use crate::google::SpreadsheetService;
use crate::index::{RecordRow, Snapshot};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Holds the currently served snapshot.
///
/// Replacement is a single pointer swap; a reader that called [`current`]
/// keeps its generation for as long as it holds the `Arc`.
///
/// [`current`]: DatasetCache::current
pub struct DatasetCache {
    current: ArcSwapOption<Snapshot>,
    next_generation: AtomicU64,
    last_failure: ArcSwapOption<RefreshFailure>,
}

/// Most recent refresh that kept the previous snapshot
#[derive(Debug, Clone)]
pub struct RefreshFailure {
    pub error: String,
    pub at: DateTime<Utc>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            next_generation: AtomicU64::new(1),
            last_failure: ArcSwapOption::empty(),
        }
    }

    /// Currently served snapshot, `None` until the first load succeeds
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    /// Build a snapshot from `rows` and make it the served one
    pub fn install(&self, rows: Vec<RecordRow>) -> Arc<Snapshot> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let snapshot = Arc::new(Snapshot::new(generation, rows));
        self.current.store(Some(Arc::clone(&snapshot)));
        self.last_failure.store(None);
        snapshot
    }

    fn record_failure(&self, error: String) {
        self.last_failure.store(Some(Arc::new(RefreshFailure {
            error,
            at: Utc::now(),
        })));
    }

    pub fn last_failure(&self) -> Option<Arc<RefreshFailure>> {
        self.last_failure.load_full()
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one refresh; failures are captured here instead of propagated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Loaded {
        generation: u64,
        rows: usize,
        borrowers: usize,
    },
    /// Fetch failed; the previous snapshot (if any) is still served
    KeptPrevious { error: String },
}

impl RefreshOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, RefreshOutcome::Loaded { .. })
    }
}

/// Fetches the dataset range and installs it into a [`DatasetCache`]
pub struct DatasetLoader {
    source: Arc<dyn SpreadsheetService>,
    range: String,
    cache: Arc<DatasetCache>,
}

impl DatasetLoader {
    pub fn new(
        source: Arc<dyn SpreadsheetService>,
        range: impl Into<String>,
        cache: Arc<DatasetCache>,
    ) -> Self {
        Self {
            source,
            range: range.into(),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<DatasetCache> {
        &self.cache
    }

    pub fn range(&self) -> &str {
        &self.range
    }

    /// Reload the whole dataset.
    ///
    /// Never fails: on error the served snapshot is left untouched and the
    /// failure is logged and recorded for the status endpoint.
    pub async fn refresh(&self) -> RefreshOutcome {
        let start = Instant::now();
        match self.source.read_range(&self.range).await {
            Ok(values) => {
                let rows: Vec<RecordRow> = values.into_iter().map(RecordRow::from_values).collect();
                let snapshot = self.cache.install(rows);
                log::info!(
                    "[Cache] Loaded generation {}: {} rows, {} borrowers in {:.2}s",
                    snapshot.generation(),
                    snapshot.rows().len(),
                    snapshot.borrower_count(),
                    start.elapsed().as_secs_f64()
                );
                RefreshOutcome::Loaded {
                    generation: snapshot.generation(),
                    rows: snapshot.rows().len(),
                    borrowers: snapshot.borrower_count(),
                }
            }
            Err(e) => {
                let error = format!("{:#}", e);
                let kept = self
                    .cache
                    .current()
                    .map(|s| format!("keeping generation {}", s.generation()))
                    .unwrap_or_else(|| "no data loaded yet".to_string());
                log::error!("[Cache] Failed to load {} ({}): {}", self.range, kept, error);
                self.cache.record_failure(error.clone());
                RefreshOutcome::KeptPrevious { error }
            }
        }
    }
}
