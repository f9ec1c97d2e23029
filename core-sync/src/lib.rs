//! Sync engine: pulls changed entries from a remote read-it-later
//! catalog and reconciles them into the local reference library.
//!
//! The scheduler drives everything: it snapshots the watermark, lists
//! due entries through `dyn EntryService`, merges each one via the
//! [`Reconciler`], downloads enabled export formats through the
//! [`AttachmentFetcher`], and advances the watermark once the pass
//! completes. Configuration and the watermark live in a
//! `dyn SettingsStore`; progress is published on the runtime event bus.

pub mod attachments;
pub mod error;
pub mod reconciler;
pub mod scheduler;
pub mod settings;

pub use attachments::AttachmentFetcher;
pub use error::{Result, SyncError};
pub use reconciler::{ReconcileOutcome, Reconciler, DEFAULT_COLLECTION_NAME, STARRED_TAG};
pub use scheduler::{SyncAttempt, SyncOutcome, SyncScheduler};
pub use settings::{DownloadPolicy, SyncSettings, MIN_SYNC_INTERVAL_MINUTES};
