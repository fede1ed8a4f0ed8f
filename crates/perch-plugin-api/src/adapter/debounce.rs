//! Debounce state and the pipeline task that drives it.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep_until, Instant};

use super::kind::{AdapterKind, RawChange};
use super::{AdapterStats, Event};

/// The single pending emission of one adapter.
///
/// Every qualifying change overwrites `last` and pushes the deadline out;
/// only the last change of a quiet period is classified.
#[derive(Debug, Default)]
pub struct DebounceState {
    last: Option<RawChange>,
    deadline: Option<Instant>,
}

impl DebounceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change and restart the timer.
    pub fn observe(&mut self, change: RawChange, now: Instant, delay: Duration) {
        self.last = Some(change);
        self.deadline = Some(now + delay);
    }

    /// When the pending change settles, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.last.is_some()
    }

    /// Take the pending change once its deadline has passed.
    pub fn settle(&mut self, now: Instant) -> Option<RawChange> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.last.take()
            }
            _ => None,
        }
    }

    /// Drop any pending change without emitting it.
    pub fn discard(&mut self) {
        self.last = None;
        self.deadline = None;
    }
}

/// Debounce raw changes for one adapter and deliver events.
///
/// Runs until the raw channel closes (the watch was released) or the event
/// receiver is dropped.
pub(crate) async fn run_pipeline(
    mut raw_rx: mpsc::UnboundedReceiver<RawChange>,
    events_tx: mpsc::Sender<Event>,
    kind: AdapterKind,
    target: PathBuf,
    delay: Duration,
    stats: Arc<AdapterStats>,
) {
    let mut state = DebounceState::new();

    loop {
        let deadline = state.deadline();
        tokio::select! {
            raw = raw_rx.recv() => match raw {
                Some(change) => {
                    if kind.accepts(&target, &change) {
                        state.observe(change, Instant::now(), delay);
                    }
                }
                None => {
                    if state.is_pending() {
                        tracing::debug!("Discarding unsettled change for {:?}", target);
                    }
                    state.discard();
                    break;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let Some(change) = state.settle(Instant::now()) else {
                    continue;
                };
                let Some(event) = kind.classify(&change).await else {
                    continue;
                };
                match events_tx.try_send(event) {
                    Ok(()) => {
                        stats.emitted.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(TrySendError::Full(event)) => {
                        stats.dropped.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!("Event channel full for {:?}, dropped {:?}", target, event);
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        }
    }

    tracing::debug!("Adapter pipeline for {:?} stopped", target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::kind::RawOp;
    use crate::adapter::EventKind;

    const DELAY: Duration = Duration::from_millis(100);

    struct Harness {
        raw_tx: mpsc::UnboundedSender<RawChange>,
        events_rx: mpsc::Receiver<Event>,
        stats: Arc<AdapterStats>,
        task: tokio::task::JoinHandle<()>,
    }

    fn spawn(kind: AdapterKind, target: PathBuf, capacity: usize) -> Harness {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(capacity);
        let stats = Arc::new(AdapterStats::default());
        let task = tokio::spawn(run_pipeline(
            raw_rx,
            events_tx,
            kind,
            target,
            DELAY,
            stats.clone(),
        ));
        Harness {
            raw_tx,
            events_rx,
            stats,
            task,
        }
    }

    #[test]
    fn test_debounce_state_settles_last_change() {
        let start = Instant::now();
        let mut state = DebounceState::new();
        state.observe(RawChange::new(RawOp::Create, "/a"), start, DELAY);
        state.observe(
            RawChange::new(RawOp::Write, "/a"),
            start + Duration::from_millis(50),
            DELAY,
        );

        assert!(state.settle(start + Duration::from_millis(120)).is_none());
        let settled = state.settle(start + Duration::from_millis(150)).unwrap();
        assert_eq!(settled.op, RawOp::Write);
        assert!(!state.is_pending());
        assert!(state.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_one_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session-abc123.json");
        std::fs::write(&path, r#"{"sessionId":"abc123"}"#).unwrap();

        let mut h = spawn(AdapterKind::SessionDirectory, dir.path().to_path_buf(), 32);
        h.raw_tx.send(RawChange::new(RawOp::Create, &path)).unwrap();
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            h.raw_tx.send(RawChange::new(RawOp::Write, &path)).unwrap();
        }

        let event = h.events_rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(event.kind, EventKind::MessageAdded);
        assert_eq!(event.session_id.as_deref(), Some("abc123"));
        assert!(h.events_rx.try_recv().is_err());
        assert_eq!(h.stats.snapshot().emitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let mut h = spawn(AdapterKind::SessionDirectory, dir.path().to_path_buf(), 32);
        h.raw_tx.send(RawChange::new(RawOp::Write, &path)).unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(h.events_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session-gone.json");

        let mut h = spawn(AdapterKind::SessionDirectory, dir.path().to_path_buf(), 32);
        h.raw_tx.send(RawChange::new(RawOp::Remove, &path)).unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(h.events_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_channel_drops_newest() {
        let db = PathBuf::from("/data/warp.sqlite");
        let mut h = spawn(AdapterKind::WriteAheadDatabase, db.clone(), 1);

        for _ in 0..3 {
            h.raw_tx.send(RawChange::new(RawOp::Write, &db)).unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        let snapshot = h.stats.snapshot();
        assert_eq!(snapshot.emitted, 1);
        assert_eq!(snapshot.dropped, 2);
        assert!(h.events_rx.try_recv().is_ok());
        assert!(h.events_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_raw_channel_discards_pending() {
        let db = PathBuf::from("/data/warp.sqlite");
        let mut h = spawn(AdapterKind::WriteAheadDatabase, db.clone(), 32);

        h.raw_tx.send(RawChange::new(RawOp::Write, &db)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(h.raw_tx);
        h.task.await.unwrap();

        assert!(h.events_rx.recv().await.is_none());
        assert_eq!(h.stats.snapshot().emitted, 0);
    }
}
