//! Per-resource filtering and classification of raw filesystem changes.

use notify::event::ModifyKind;
use notify::EventKind as NotifyKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{Event, EventKind};

/// A raw change, reduced to the operations the pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawOp {
    Create,
    Write,
    /// Metadata, rename or an unspecified change.
    Update,
    Remove,
}

impl RawOp {
    /// Map a notify event kind. Access events are not changes.
    pub fn from_notify(kind: &NotifyKind) -> Option<Self> {
        match kind {
            NotifyKind::Create(_) => Some(RawOp::Create),
            NotifyKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
                Some(RawOp::Write)
            }
            NotifyKind::Modify(ModifyKind::Metadata(_) | ModifyKind::Name(_)) => {
                Some(RawOp::Update)
            }
            NotifyKind::Remove(_) => Some(RawOp::Remove),
            NotifyKind::Any | NotifyKind::Other => Some(RawOp::Update),
            NotifyKind::Access(_) => None,
        }
    }
}

/// One raw change to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub op: RawOp,
    pub path: PathBuf,
}

impl RawChange {
    pub fn new(op: RawOp, path: impl Into<PathBuf>) -> Self {
        Self {
            op,
            path: path.into(),
        }
    }
}

/// What kind of resource an adapter watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// A directory of `session-*.json` files. The target is the directory.
    SessionDirectory,

    /// A database in write-ahead-log mode. The target is the database file;
    /// its parent directory is watched.
    WriteAheadDatabase,
}

impl AdapterKind {
    /// Directory the OS watch is placed on.
    pub fn watch_dir(self, target: &Path) -> Option<PathBuf> {
        match self {
            AdapterKind::SessionDirectory => Some(target.to_path_buf()),
            AdapterKind::WriteAheadDatabase => target
                .parent()
                .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
                .map(Path::to_path_buf),
        }
    }

    /// Whether a raw change concerns this adapter at all.
    pub fn accepts(self, target: &Path, change: &RawChange) -> bool {
        let Some(name) = change.path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        match self {
            AdapterKind::SessionDirectory => is_session_file(name),
            AdapterKind::WriteAheadDatabase => {
                if change.op != RawOp::Write {
                    return false;
                }
                let Some(db) = target.file_name().and_then(|n| n.to_str()) else {
                    return false;
                };
                name == db || name.strip_prefix(db) == Some("-wal")
            }
        }
    }

    /// Turn the last change of a quiet period into an event.
    ///
    /// Returns `None` when nothing should be emitted. Session files are read
    /// without blocking the runtime.
    pub async fn classify(self, change: &RawChange) -> Option<Event> {
        match self {
            AdapterKind::SessionDirectory => {
                let kind = match change.op {
                    RawOp::Remove => return None,
                    RawOp::Create => EventKind::SessionCreated,
                    RawOp::Write => EventKind::MessageAdded,
                    RawOp::Update => EventKind::SessionUpdated,
                };
                let session_id = read_session_id(&change.path).await?;
                Some(Event {
                    kind,
                    session_id: Some(session_id),
                })
            }
            AdapterKind::WriteAheadDatabase => Some(Event {
                kind: EventKind::SessionUpdated,
                session_id: None,
            }),
        }
    }
}

fn is_session_file(name: &str) -> bool {
    name.starts_with("session-") && name.ends_with(".json")
}

#[derive(Deserialize)]
struct SessionHeader {
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
}

/// Read the top-level `sessionId` of a session file.
pub async fn read_session_id(path: &Path) -> Option<String> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| tracing::debug!("Cannot read {:?}: {}", path, e))
        .ok()?;
    extract_session_id(&data)
}

/// Extract a non-empty `sessionId` string from JSON bytes.
pub fn extract_session_id(data: &[u8]) -> Option<String> {
    let header: SessionHeader = serde_json::from_slice(data).ok()?;
    header.session_id.filter(|id| !id.is_empty())
}
