//! Broadcast event bus for engine-level notifications.
//!
//! Frontends subscribe to observe sync progress and user-facing
//! notices without holding a reference to the scheduler itself. Events
//! are fire-and-forget; a bus with no subscribers drops them.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

/// How urgently a frontend should surface an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Progress of a sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// A pass began. `full` is set when no watermark existed and the
    /// whole remote catalog is being walked.
    Started { full: bool },
    /// A listing page was fetched.
    Progress { fetched: usize, total: usize },
    /// The pass finished, possibly with per-entry errors.
    Completed {
        added: usize,
        updated: usize,
        errors: usize,
        duration_ms: u64,
    },
    /// The pass aborted before completing.
    Failed { message: String },
}

/// User-facing notices outside the regular sync lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoticeEvent {
    /// A sync was requested while another was still running.
    SyncAlreadyRunning,
    /// An attachment could not be stored; the record itself synced.
    AttachmentFailed { entry_id: u64, format: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoreEvent {
    Sync(SyncEvent),
    Notice(NoticeEvent),
}

impl CoreEvent {
    /// Short human-readable summary, suitable for a status line.
    pub fn description(&self) -> String {
        match self {
            CoreEvent::Sync(SyncEvent::Started { full: true }) => "Full sync started".into(),
            CoreEvent::Sync(SyncEvent::Started { full: false }) => {
                "Incremental sync started".into()
            }
            CoreEvent::Sync(SyncEvent::Progress { fetched, total }) => {
                format!("Fetched {} of {} entries", fetched, total)
            }
            CoreEvent::Sync(SyncEvent::Completed {
                added,
                updated,
                errors,
                ..
            }) => format!(
                "Sync finished: {} added, {} updated, {} errors",
                added, updated, errors
            ),
            CoreEvent::Sync(SyncEvent::Failed { message }) => {
                format!("Sync failed: {}", message)
            }
            CoreEvent::Notice(NoticeEvent::SyncAlreadyRunning) => {
                "A sync is already in progress".into()
            }
            CoreEvent::Notice(NoticeEvent::AttachmentFailed { entry_id, format }) => {
                format!("Could not attach {} file for entry {}", format, entry_id)
            }
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => Severity::Error,
            CoreEvent::Sync(SyncEvent::Completed { errors, .. }) if *errors > 0 => {
                Severity::Warning
            }
            CoreEvent::Notice(_) => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// Multi-producer multi-consumer event fan-out.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Lagging or absent subscribers are not errors.
    pub fn publish(&self, event: CoreEvent) {
        trace!(event = %event.description(), "Publishing event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
