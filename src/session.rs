//! Task timer state for one participant session.
//!
//! ```text
//! Idle --start--> Timing --stop--> Stopped --save--> Idle
//! ```
//!
//! `start` is accepted in any state and always begins a fresh interval.
//! `stop` without a recorded start is a no-op. `save` writes the task row
//! and returns the session to `Idle`.

use crate::error::StoreError;
use crate::forms::TaskDraft;
use crate::models::{now_timestamp, round_duration, TaskRecord};
use crate::store::RecordStore;
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of monotonic time for the timer.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Where the task timer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Timing,
    Stopped,
}

/// Per-session timer state.
#[derive(Debug)]
pub struct TaskSession<C: Clock = SystemClock> {
    clock: C,
    status: TimerStatus,
    start_instant: Option<Instant>,
    last_duration: Option<Duration>,
}

impl TaskSession<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TaskSession<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TaskSession<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            status: TimerStatus::Idle,
            start_instant: None,
            last_duration: None,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    /// Duration recorded by the last `stop`, if any.
    pub fn last_duration(&self) -> Option<Duration> {
        self.last_duration
    }

    /// Begin timing. Any unstopped or previously stopped interval is discarded.
    pub fn start(&mut self) {
        if self.status == TimerStatus::Timing {
            debug!("Timer restarted; discarding unstopped interval");
        }
        self.start_instant = Some(self.clock.now());
        self.last_duration = None;
        self.status = TimerStatus::Timing;
    }

    /// Stop timing and record the elapsed time since `start`.
    ///
    /// Returns the recorded duration, or `None` when no start was recorded.
    pub fn stop(&mut self) -> Option<Duration> {
        let start = self.start_instant?;
        let elapsed = self.clock.now().saturating_duration_since(start);

        self.last_duration = Some(elapsed);
        self.status = TimerStatus::Stopped;
        debug!("Timer stopped after {:.2}s", elapsed.as_secs_f64());

        Some(elapsed)
    }

    /// Build the task record for `draft` from the current timer state.
    pub fn record_for(&self, draft: &TaskDraft) -> TaskRecord {
        TaskRecord {
            timestamp: now_timestamp(),
            task_name: draft.task_name.clone(),
            success: draft.success,
            duration_seconds: self
                .last_duration
                .map(|d| round_duration(d.as_secs_f64())),
            notes: draft.notes.clone(),
        }
    }

    /// Write the task row and reset the timer.
    ///
    /// On a storage failure the timer state is kept so the save can be retried.
    pub fn save(&mut self, draft: &TaskDraft, store: &RecordStore) -> Result<TaskRecord, StoreError> {
        let record = self.record_for(draft);
        store.append(&record)?;

        self.reset();
        Ok(record)
    }

    fn reset(&mut self) {
        self.start_instant = None;
        self.last_duration = None;
        self.status = TimerStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskOutcome;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Clock advanced by hand.
    #[derive(Clone)]
    struct ManualClock {
        now: Rc<Cell<Instant>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Rc::new(Cell::new(Instant::now())),
            }
        }

        fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.now.get()
        }
    }

    fn draft() -> TaskDraft {
        TaskDraft {
            task_name: "Task 1".to_string(),
            success: TaskOutcome::Yes,
            notes: String::new(),
        }
    }

    #[test]
    fn test_start_stop_records_elapsed() {
        let clock = ManualClock::new();
        let mut session = TaskSession::with_clock(clock.clone());

        session.start();
        assert_eq!(session.status(), TimerStatus::Timing);
        clock.advance(Duration::from_millis(4_250));
        let elapsed = session.stop().unwrap();

        assert_eq!(session.status(), TimerStatus::Stopped);
        assert!((elapsed.as_secs_f64() - 4.25).abs() < 1e-6);
        assert_eq!(session.record_for(&draft()).duration_seconds, Some(4.25));
    }

    #[test]
    fn test_real_clock_elapsed() {
        let mut session = TaskSession::new();
        session.start();
        std::thread::sleep(Duration::from_millis(50));
        let elapsed = session.stop().unwrap().as_secs_f64();

        assert!(elapsed >= 0.05);
        assert!(elapsed < 1.0);
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let mut session = TaskSession::with_clock(ManualClock::new());

        assert_eq!(session.stop(), None);
        assert_eq!(session.status(), TimerStatus::Idle);
        assert_eq!(session.last_duration(), None);
    }

    #[test]
    fn test_restart_discards_unstopped_interval() {
        let clock = ManualClock::new();
        let mut session = TaskSession::with_clock(clock.clone());

        session.start();
        clock.advance(Duration::from_secs(30));
        session.start();
        clock.advance(Duration::from_secs(5));

        assert_eq!(session.stop(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_save_without_timer_leaves_duration_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let mut session = TaskSession::with_clock(ManualClock::new());

        let record = session.save(&draft(), &store).unwrap();
        assert_eq!(record.duration_seconds, None);

        let loaded: Vec<TaskRecord> = store.load().unwrap();
        assert_eq!(loaded[0].duration_seconds, None);
    }

    #[test]
    fn test_save_without_stop_leaves_duration_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let clock = ManualClock::new();
        let mut session = TaskSession::with_clock(clock.clone());

        session.start();
        clock.advance(Duration::from_secs(10));
        let record = session.save(&draft(), &store).unwrap();

        assert_eq!(record.duration_seconds, None);
        assert_eq!(session.status(), TimerStatus::Idle);
    }

    #[test]
    fn test_save_resets_state() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let clock = ManualClock::new();
        let mut session = TaskSession::with_clock(clock.clone());

        session.start();
        clock.advance(Duration::from_millis(1_234));
        session.stop();
        let record = session.save(&draft(), &store).unwrap();
        assert_eq!(record.duration_seconds, Some(1.23));

        assert_eq!(session.status(), TimerStatus::Idle);
        assert_eq!(session.last_duration(), None);
        assert_eq!(session.stop(), None);

        let second = session.save(&draft(), &store).unwrap();
        assert_eq!(second.duration_seconds, None);
    }

    #[test]
    fn test_failed_save_keeps_duration() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        // A directory where the dataset file should be makes the append fail.
        std::fs::create_dir(store.path_for(crate::models::Dataset::Task)).unwrap();

        let clock = ManualClock::new();
        let mut session = TaskSession::with_clock(clock.clone());
        session.start();
        clock.advance(Duration::from_secs(2));
        session.stop();

        assert!(session.save(&draft(), &store).is_err());
        assert_eq!(session.status(), TimerStatus::Stopped);
        assert_eq!(session.last_duration(), Some(Duration::from_secs(2)));
    }
}
