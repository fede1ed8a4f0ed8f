//! Adapter event pipeline.
//!
//! An adapter watches one external resource and turns the burst of raw
//! filesystem notifications it produces into a small event vocabulary:
//!
//! ```text
//! notify thread            tokio task                       plugin
//!      │                       │                               │
//! raw change ──► unbounded ──► filter ──► DebounceState ──► try_send (cap 32)
//!                                            │ 100ms quiet       │
//!                                            └─► classify ──────►┘
//! ```
//!
//! Delivery never blocks the producer. When the consumer falls behind the
//! newest event is dropped and counted.

mod debounce;
mod kind;

pub use debounce::DebounceState;
pub use kind::{extract_session_id, read_session_id, AdapterKind, RawChange, RawOp};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AdapterError;

/// Quiet period before a burst of changes is emitted.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// Capacity of each adapter's event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// Events
// =============================================================================

/// Normalized change kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionCreated,
    MessageAdded,
    SessionUpdated,
}

impl EventKind {
    pub fn label(self) -> &'static str {
        match self {
            EventKind::SessionCreated => "created",
            EventKind::MessageAdded => "message",
            EventKind::SessionUpdated => "updated",
        }
    }
}

/// An event delivered to the owning plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Affected session, when the resource identifies one.
    pub session_id: Option<String>,
}

// =============================================================================
// Stats
// =============================================================================

/// Counters shared between the watcher, the pipeline and diagnostics.
#[derive(Debug, Default)]
pub struct AdapterStats {
    pub(crate) emitted: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) watch_errors: AtomicU64,
}

/// Point-in-time copy of [`AdapterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub emitted: u64,
    pub dropped: u64,
    pub watch_errors: u64,
}

impl AdapterStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            emitted: self.emitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            watch_errors: self.watch_errors.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// A running watch on one target.
///
/// Dropping the adapter releases the OS watch and ends the event stream.
pub struct Adapter {
    kind: AdapterKind,
    target: PathBuf,
    stats: Arc<AdapterStats>,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Adapter {
    /// Start watching `target`.
    ///
    /// The pipeline task is spawned on `runtime`; events arrive on the
    /// returned receiver until the adapter is stopped.
    pub fn watch(
        kind: AdapterKind,
        target: impl Into<PathBuf>,
        runtime: &Handle,
    ) -> Result<(Adapter, mpsc::Receiver<Event>), AdapterError> {
        let target = target.into();
        let watch_dir = kind
            .watch_dir(&target)
            .filter(|dir| dir.is_dir())
            .ok_or_else(|| AdapterError::TargetMissing(target.clone()))?;

        let stats = Arc::new(AdapterStats::default());
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let callback_stats = stats.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    let Some(op) = RawOp::from_notify(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        // Receiver gone means the pipeline already stopped.
                        let _ = raw_tx.send(RawChange { op, path });
                    }
                }
                Err(e) => {
                    callback_stats.watch_errors.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Watch error: {}", e);
                }
            })?;
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        let task = runtime.spawn(debounce::run_pipeline(
            raw_rx,
            events_tx,
            kind,
            target.clone(),
            DEBOUNCE,
            stats.clone(),
        ));

        tracing::info!("Watching {:?} ({:?})", target, kind);

        Ok((
            Adapter {
                kind,
                target,
                stats,
                _watcher: watcher,
                task,
            },
            events_rx,
        ))
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Release the watch. Any unsettled change is discarded.
    pub fn stop(self) {
        tracing::info!("Stopped watching {:?}", self.target);
    }
}

impl Drop for Adapter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_target_fails_synchronously() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = Adapter::watch(
            AdapterKind::SessionDirectory,
            dir.path().join("missing"),
            rt.handle(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, AdapterError::TargetMissing(_)));

        let err = Adapter::watch(
            AdapterKind::WriteAheadDatabase,
            dir.path().join("missing").join("db.sqlite"),
            rt.handle(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, AdapterError::TargetMissing(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_session_file_produces_event() {
        let dir = tempfile::tempdir().unwrap();
        let (adapter, mut rx) = Adapter::watch(
            AdapterKind::SessionDirectory,
            dir.path(),
            &Handle::current(),
        )
        .unwrap();

        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(
            dir.path().join("session-abc123.json"),
            r#"{"sessionId":"abc123"}"#,
        )
        .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within timeout")
            .expect("stream ended");
        assert_eq!(event.session_id.as_deref(), Some("abc123"));

        adapter.stop();
        let end = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("stream did not end");
        assert!(end.is_none());
    }
}
