//! The timer engine: the running/stopped state machine for one
//! activity's timer.
//!
//! Elapsed time is always derived from the wall clock as
//! `now - anchor`, never from an incremented counter, so a delayed or
//! suspended tick cannot drift the display. The anchor is persisted
//! as the entry's `start_time` at creation, which is what makes
//! reconciliation after a host restart exact: the store is asked for
//! a running entry and elapsed time is recomputed from that entry's
//! own `start_time`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::domain::{
    ActivityId, NewRunningEntry, TimeEntry, TimeEntryId, TimerError, UserId,
};
use crate::store::EntryStore;

/// Cadences for the two loops owned by a running engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// How often the live elapsed value is recomputed and published.
    pub tick_interval: Duration,
    /// How often progress is checkpointed to the store.
    pub checkpoint_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            checkpoint_interval: Duration::from_secs(10),
        }
    }
}

/// Read-only snapshot of an engine's state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub running: bool,
    pub entry_id: Option<TimeEntryId>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    pub elapsed_seconds: i64,
}

/// Aborts the wrapped task when dropped, so leaving the Running state
/// can never leak a ticking loop.
struct TaskGuard(JoinHandle<()>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum EngineState {
    Stopped,
    Running {
        entry_id: TimeEntryId,
        anchor: OffsetDateTime,
        _tick: TaskGuard,
        _checkpoint: TaskGuard,
    },
}

/// Per-activity timer state machine.
///
/// One engine instance per (user, activity); the store remains the
/// source of truth for "is a timer running", so callers must
/// [`attach`](TimerEngine::attach) before trusting local state. The
/// internal mutex is held across store writes, which serializes
/// overlapping `start`/`stop` calls on the same engine.
pub struct TimerEngine<S> {
    store: Arc<S>,
    user_id: UserId,
    activity_id: ActivityId,
    config: EngineConfig,
    state: Mutex<EngineState>,
    elapsed: watch::Sender<i64>,
}

impl<S: EntryStore> TimerEngine<S> {
    pub fn new(store: Arc<S>, user_id: UserId, activity_id: ActivityId) -> Self {
        Self::with_config(store, user_id, activity_id, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<S>,
        user_id: UserId,
        activity_id: ActivityId,
        config: EngineConfig,
    ) -> Self {
        let (elapsed, _) = watch::channel(0);
        Self {
            store,
            user_id,
            activity_id,
            config,
            state: Mutex::new(EngineState::Stopped),
            elapsed,
        }
    }

    pub fn activity_id(&self) -> ActivityId {
        self.activity_id
    }

    /// Live elapsed seconds, updated at tick cadence while running.
    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.elapsed.subscribe()
    }

    pub async fn status(&self) -> TimerStatus {
        let state = self.state.lock().await;
        match &*state {
            EngineState::Stopped => TimerStatus {
                running: false,
                entry_id: None,
                started_at: None,
                elapsed_seconds: 0,
            },
            EngineState::Running {
                entry_id, anchor, ..
            } => TimerStatus {
                running: true,
                entry_id: Some(*entry_id),
                started_at: Some(*anchor),
                elapsed_seconds: elapsed_since(*anchor),
            },
        }
    }

    /// Reconcile with store truth when this engine begins observing
    /// its activity.
    ///
    /// If the store holds a running entry, the engine transitions to
    /// Running anchored at that entry's `start_time`, so the elapsed
    /// display resumes from the true value rather than zero. A read
    /// failure leaves the engine Stopped (fail safe: assume no timer
    /// rather than guessing).
    #[instrument(name = "TimerEngine::attach", skip(self), fields(activity = %self.activity_id))]
    pub async fn attach(&self) -> Result<Option<TimeEntry>, TimerError> {
        let mut state = self.state.lock().await;
        if matches!(*state, EngineState::Running { .. }) {
            return Ok(None);
        }

        let found = self
            .store
            .find_running_entry(self.user_id, self.activity_id)
            .await
            .map_err(TimerError::StoreRead)?;

        match found {
            Some(entry) => {
                tracing::debug!(entry = %entry.id, "resuming running entry from store");
                *state = self.enter_running(entry.id, entry.start_time);
                Ok(Some(entry))
            }
            None => {
                self.elapsed.send_replace(0);
                Ok(None)
            }
        }
    }

    /// Start a new timer.
    ///
    /// Any running entries left behind for this activity (e.g. from a
    /// stop that never completed) are first closed with a synthesized
    /// end time, so at most one entry is running afterwards. On store
    /// failure the engine remains Stopped and the error is surfaced;
    /// there is no partial state.
    #[instrument(name = "TimerEngine::start", skip(self), fields(activity = %self.activity_id))]
    pub async fn start(&self) -> Result<TimeEntry, TimerError> {
        let mut state = self.state.lock().await;
        if matches!(*state, EngineState::Running { .. }) {
            return Err(TimerError::AlreadyRunning);
        }

        let now = OffsetDateTime::now_utc();
        let closed = self
            .store
            .close_running_entries(self.user_id, self.activity_id, now)
            .await
            .map_err(TimerError::StoreWrite)?;
        if closed > 0 {
            tracing::warn!(closed, "closed stale running entries before start");
        }

        let entry = self
            .store
            .create_running_entry(&NewRunningEntry {
                activity_id: self.activity_id,
                user_id: self.user_id,
                start_time: now,
                description: None,
            })
            .await
            .map_err(TimerError::StoreWrite)?;

        *state = self.enter_running(entry.id, entry.start_time);
        Ok(entry)
    }

    /// Stop the running timer.
    ///
    /// The final duration is recomputed from the wall clock, not the
    /// last checkpoint, which may lag. On store failure the engine
    /// stays Running with its loops intact: the anchor is not lost,
    /// the display keeps ticking, and the call can be retried.
    #[instrument(name = "TimerEngine::stop", skip(self), fields(activity = %self.activity_id))]
    pub async fn stop(&self) -> Result<TimeEntry, TimerError> {
        let mut state = self.state.lock().await;
        let (entry_id, anchor) = match &*state {
            EngineState::Stopped => return Err(TimerError::NotRunning),
            EngineState::Running {
                entry_id, anchor, ..
            } => (*entry_id, *anchor),
        };

        let now = OffsetDateTime::now_utc();
        let final_seconds = (now - anchor).whole_seconds().max(0);
        let entry = self
            .store
            .finish_entry(entry_id, now, final_seconds)
            .await
            .map_err(TimerError::StoreWrite)?;

        // Dropping the Running state aborts both loops.
        *state = EngineState::Stopped;
        self.elapsed.send_replace(final_seconds);
        Ok(entry)
    }

    /// Release local state ahead of host teardown.
    ///
    /// Cancels both loops and makes one best-effort final checkpoint;
    /// the store record stays running, so the next [`attach`]
    /// recovers the timer from its persisted `start_time` no matter
    /// how many checkpoints landed.
    ///
    /// [`attach`]: TimerEngine::attach
    #[instrument(name = "TimerEngine::detach", skip(self), fields(activity = %self.activity_id))]
    pub async fn detach(&self) {
        let mut state = self.state.lock().await;
        if let EngineState::Running {
            entry_id, anchor, ..
        } = std::mem::replace(&mut *state, EngineState::Stopped)
        {
            let seconds = elapsed_since(anchor);
            if let Err(err) = self.store.checkpoint_duration(entry_id, seconds).await {
                tracing::warn!(entry = %entry_id, %err, "final checkpoint failed on detach");
            }
        }
    }

    fn enter_running(&self, entry_id: TimeEntryId, anchor: OffsetDateTime) -> EngineState {
        self.elapsed.send_replace(elapsed_since(anchor));

        let tick = {
            let elapsed = self.elapsed.clone();
            let interval = self.config.tick_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    elapsed.send_replace(elapsed_since(anchor));
                }
            })
        };

        let checkpoint = {
            let store = Arc::clone(&self.store);
            let interval = self.config.checkpoint_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                // The first interval tick completes immediately;
                // consume it so checkpoints start one interval in.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let seconds = elapsed_since(anchor);
                    if let Err(err) = store.checkpoint_duration(entry_id, seconds).await {
                        tracing::warn!(entry = %entry_id, %err, "checkpoint write failed");
                    }
                }
            })
        };

        EngineState::Running {
            entry_id,
            anchor,
            _tick: TaskGuard(tick),
            _checkpoint: TaskGuard(checkpoint),
        }
    }
}

fn elapsed_since(anchor: OffsetDateTime) -> i64 {
    (OffsetDateTime::now_utc() - anchor).whole_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn engine(store: Arc<InMemoryStore>) -> TimerEngine<InMemoryStore> {
        TimerEngine::with_config(
            store,
            UserId::random(),
            ActivityId::random(),
            EngineConfig {
                tick_interval: Duration::from_millis(50),
                checkpoint_interval: Duration::from_millis(100),
            },
        )
    }

    fn seconds_ago(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::now_utc() - time::Duration::seconds(seconds)
    }

    #[tokio::test]
    async fn start_then_stop_persists_wallclock_duration() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));

        let started = engine.start().await.unwrap();
        assert!(started.is_running);
        assert_eq!(started.duration_seconds, 0);

        tokio::time::sleep(Duration::from_millis(1200)).await;

        let stopped = engine.stop().await.unwrap();
        assert!(!stopped.is_running);
        assert!((1..=2).contains(&stopped.duration_seconds));

        // end - start matches the persisted duration exactly.
        let end = stopped.end_time.expect("stopped entry has end_time");
        assert_eq!(
            (end - stopped.start_time).whole_seconds(),
            stopped.duration_seconds
        );
        assert!(store.running_entries(engine.activity_id()).is_empty());
    }

    #[tokio::test]
    async fn attach_resumes_from_persisted_start_time() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));
        let seeded = store.seed_running_entry(
            engine.user_id,
            engine.activity_id,
            seconds_ago(125),
        );

        let found = engine.attach().await.unwrap().expect("running entry");
        assert_eq!(found.id, seeded.id);

        let status = engine.status().await;
        assert!(status.running);
        assert!((125..=126).contains(&status.elapsed_seconds));
        assert!((125..=126).contains(&*engine.subscribe().borrow()));
    }

    #[tokio::test]
    async fn attach_without_running_entry_stays_stopped() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store);

        assert!(engine.attach().await.unwrap().is_none());
        assert!(!engine.status().await.running);
    }

    #[tokio::test]
    async fn attach_read_failure_is_fail_safe() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));
        store.seed_running_entry(engine.user_id, engine.activity_id, seconds_ago(30));
        store.set_fail_reads(true);

        assert!(matches!(
            engine.attach().await,
            Err(TimerError::StoreRead(_))
        ));
        assert!(!engine.status().await.running);
    }

    #[tokio::test]
    async fn start_closes_stale_running_entries() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));
        let stale =
            store.seed_running_entry(engine.user_id, engine.activity_id, seconds_ago(60));

        engine.start().await.unwrap();

        let running = store.running_entries(engine.activity_id());
        assert_eq!(running.len(), 1);
        assert_ne!(running[0].id, stale.id);

        let closed = store.entry(stale.id).unwrap();
        assert!(!closed.is_running);
        let end = closed.end_time.expect("synthesized end_time");
        assert_eq!(
            (end - closed.start_time).whole_seconds(),
            closed.duration_seconds
        );
    }

    #[tokio::test]
    async fn second_start_fails_and_leaves_one_running_entry() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));

        let (first, second) = tokio::join!(engine.start(), engine.start());
        assert!(first.is_ok() != second.is_ok());
        assert!(matches!(
            first.and(second),
            Err(TimerError::AlreadyRunning)
        ));
        assert_eq!(store.running_entries(engine.activity_id()).len(), 1);
    }

    #[tokio::test]
    async fn stop_when_stopped_is_an_explicit_error() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));

        engine.start().await.unwrap();
        let finished = engine.stop().await.unwrap();
        assert!(matches!(engine.stop().await, Err(TimerError::NotRunning)));

        // The second call did not double-finalize the entry.
        assert_eq!(store.entry(finished.id).unwrap(), finished);
    }

    #[tokio::test]
    async fn stop_failure_leaves_engine_running_and_retryable() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));
        store.seed_running_entry(engine.user_id, engine.activity_id, seconds_ago(40));
        engine.attach().await.unwrap();

        store.set_fail_writes(true);
        assert!(matches!(
            engine.stop().await,
            Err(TimerError::StoreWrite(_))
        ));
        let status = engine.status().await;
        assert!(status.running);
        assert!(status.elapsed_seconds >= 40);

        store.set_fail_writes(false);
        let stopped = engine.stop().await.unwrap();
        assert!(stopped.duration_seconds >= 40);
        assert!(!engine.status().await.running);
    }

    #[tokio::test]
    async fn checkpoints_persist_progress_while_running() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));
        let seeded =
            store.seed_running_entry(engine.user_id, engine.activity_id, seconds_ago(50));
        engine.attach().await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(store.entry(seeded.id).unwrap().duration_seconds >= 50);
    }

    #[tokio::test]
    async fn checkpoint_failures_do_not_stop_the_timer() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));
        store.seed_running_entry(engine.user_id, engine.activity_id, seconds_ago(10));
        engine.attach().await.unwrap();

        store.set_fail_writes(true);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(engine.status().await.running);

        store.set_fail_writes(false);
        assert!(engine.stop().await.is_ok());
    }

    #[tokio::test]
    async fn detach_checkpoints_and_leaves_entry_running() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));
        let seeded =
            store.seed_running_entry(engine.user_id, engine.activity_id, seconds_ago(75));
        engine.attach().await.unwrap();

        engine.detach().await;

        assert!(!engine.status().await.running);
        let entry = store.entry(seeded.id).unwrap();
        assert!(entry.is_running, "detach must not finalize the entry");
        assert!(entry.duration_seconds >= 75);

        // A fresh attach recovers the timer from store truth.
        assert!(engine.attach().await.unwrap().is_some());
        assert!(engine.status().await.elapsed_seconds >= 75);
    }
}
