use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::engine::reference::{ReferenceError, ReferenceLoader, ReferenceTable};

/// Time source for cache expiry; replaced by a fake clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Served from cache within the staleness window.
    Fresh,
    /// A reload just succeeded.
    Reloaded,
    /// A reload failed; the previous table is being served.
    Stale,
    /// Nothing has ever loaded; the table is empty.
    Unavailable,
}

impl CacheStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Reloaded => "reloaded",
            Self::Stale => "stale",
            Self::Unavailable => "unavailable",
        }
    }

    pub const fn has_source(self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

#[derive(Debug, Clone)]
pub struct TableLookup {
    pub table: Arc<ReferenceTable>,
    pub status: CacheStatus,
    pub reload_error: Option<ReferenceError>,
}

#[derive(Debug, Clone)]
struct CachedTable {
    table: Arc<ReferenceTable>,
    loaded_at: Instant,
}

/// Process-wide, time-bounded cache around a [`ReferenceLoader`].
///
/// The staleness check and the reload are not serialized: concurrent callers
/// that all see an expired entry may each reload. Each reload builds a
/// complete table before swapping it in under the write lock, so readers only
/// ever observe a whole table.
pub struct ReferenceCache {
    loader: Arc<dyn ReferenceLoader>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    state: RwLock<Option<CachedTable>>,
}

impl ReferenceCache {
    pub fn new(loader: Arc<dyn ReferenceLoader>, ttl: Duration) -> Self {
        Self::with_clock(loader, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(loader: Arc<dyn ReferenceLoader>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            loader,
            clock,
            ttl,
            state: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get_reference_table(&self) -> TableLookup {
        let now = self.clock.now();
        let cached = self.snapshot();

        if let Some(current) = &cached
            && now.saturating_duration_since(current.loaded_at) < self.ttl
        {
            return TableLookup {
                table: Arc::clone(&current.table),
                status: CacheStatus::Fresh,
                reload_error: None,
            };
        }

        match self.loader.load() {
            Ok(loaded) => {
                let table = Arc::new(loaded.table);
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                *state = Some(CachedTable {
                    table: Arc::clone(&table),
                    loaded_at: now,
                });
                TableLookup {
                    table,
                    status: CacheStatus::Reloaded,
                    reload_error: None,
                }
            }
            Err(error) => match cached {
                Some(previous) => {
                    tracing::warn!(error = %error, "reference reload failed; serving previous table");
                    TableLookup {
                        table: previous.table,
                        status: CacheStatus::Stale,
                        reload_error: Some(error),
                    }
                }
                None => {
                    tracing::warn!(error = %error, "reference table unavailable");
                    TableLookup {
                        table: Arc::new(ReferenceTable::empty()),
                        status: CacheStatus::Unavailable,
                        reload_error: Some(error),
                    }
                }
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = None;
    }

    fn snapshot(&self) -> Option<CachedTable> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
