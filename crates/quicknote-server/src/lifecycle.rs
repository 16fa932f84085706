//! Note lifecycle: expiry evaluation, view accounting and garbage collection.
//!
//! A note is observed in one of four states:
//!
//! ```text
//!            fetch / record_view
//!   Alive ───────────────────────► Alive
//!     │ expires_at < now               │ view_count reaches the limit
//!     ▼                                ▼
//!   ExpiredByTime                ExpiredByViews
//!     └────────── sweep ──────────────┘
//!                   ▼
//!                 Absent
//! ```
//!
//! Dead notes are removed eagerly by the sweep, and every read re-checks the
//! state anyway, so a row that is still physically present but dead is never
//! served.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub use quicknote_core::expiry::{expires_at, ExpiryDuration, ExpiryUnit};

use crate::store::{NoteRecord, NoteStore, ViewMutation};

// ── Clock ─────────────────────────────────────────────────────────────────────

pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self(AtomicI64::new(start_ms))
    }

    pub fn set(&self, ms: i64) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ── States ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Alive,
    ExpiredByTime,
    ExpiredByViews,
    Absent,
}

impl NoteState {
    pub fn is_alive(self) -> bool {
        self == NoteState::Alive
    }
}

/// Classify a (possibly missing) record at `now`. Time expiry is reported
/// before view exhaustion.
pub fn evaluate(record: Option<&NoteRecord>, now: i64) -> NoteState {
    match record {
        None => NoteState::Absent,
        Some(r) if r.is_expired(now) => NoteState::ExpiredByTime,
        Some(r) if r.is_exhausted() => NoteState::ExpiredByViews,
        Some(_) => NoteState::Alive,
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Lifecycle<S> {
    store: S,
    clock: Arc<dyn Clock>,
    sweep_on_fetch: bool,
}

impl<S: NoteStore> Lifecycle<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            sweep_on_fetch: true,
        }
    }

    /// Whether every fetch first sweeps dead notes (on by default).
    pub fn sweep_on_fetch(mut self, enabled: bool) -> Self {
        self.sweep_on_fetch = enabled;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Absolute expiry for a note created now.
    pub fn expiry_from_now(&self, duration: ExpiryDuration) -> Option<i64> {
        expires_at(self.now_ms(), duration)
    }

    /// Delete every note that is expired by time or out of views.
    /// Idempotent; safe to run concurrently with itself and with reads.
    pub fn collect_garbage(&self) -> Result<usize> {
        let now = self.now_ms();
        let removed = self.store.delete_where(&|r: &NoteRecord| r.is_dead(now))?;
        if removed > 0 {
            info!(removed, "swept dead notes");
        }
        Ok(removed)
    }

    pub fn state(&self, id: &str) -> Result<NoteState> {
        let record = self.store.get(id)?;
        Ok(evaluate(record.as_ref(), self.now_ms()))
    }

    /// Look up a note for delivery. Does not count a view.
    ///
    /// Returns `None` for any state other than [`NoteState::Alive`].
    pub fn fetch(&self, id: &str) -> Result<Option<NoteRecord>> {
        if self.sweep_on_fetch {
            if let Err(e) = self.collect_garbage() {
                warn!(error = %e, "opportunistic sweep failed");
            }
        }

        let record = self.store.get(id)?;
        let state = evaluate(record.as_ref(), self.now_ms());
        debug!(id, ?state, "note fetched");
        Ok(record.filter(|_| state.is_alive()))
    }

    /// Count one successful delivery of `id`.
    ///
    /// The increment only happens if the note is still alive at the moment
    /// the store applies it, so at most `limit` calls ever return `true`.
    /// A note that runs out of views is deleted right away. Calling this for
    /// a note that is gone is a no-op returning `false`.
    pub fn record_view(&self, id: &str) -> Result<bool> {
        let now = self.now_ms();
        match self
            .store
            .mutate_view_counter(id, &|r: &NoteRecord| !r.is_dead(now))?
        {
            ViewMutation::Counted(record) => {
                if record.is_exhausted() {
                    if let Err(e) = self.store.delete(id) {
                        warn!(id, error = %e, "failed to delete exhausted note; sweep will retry");
                    } else {
                        info!(id, "note exhausted and deleted");
                    }
                }
                Ok(true)
            }
            ViewMutation::Rejected | ViewMutation::Missing => {
                debug!(id, "view not counted; note unavailable");
                Ok(false)
            }
        }
    }
}

impl<S: NoteStore + Clone + 'static> Lifecycle<S> {
    /// Run [`Lifecycle::collect_garbage`] every `every` on the tokio runtime,
    /// in addition to the opportunistic sweep on fetch.
    pub fn spawn_sweep(&self, every: Duration) -> JoinHandle<()> {
        let lifecycle = self.clone();
        let every = every.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = lifecycle.collect_garbage() {
                    warn!(error = %e, "background sweep failed");
                }
            }
        })
    }
}
