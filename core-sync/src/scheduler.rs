//! Timer-driven sync orchestration.
//!
//! At most one pass runs at a time regardless of trigger source; the
//! in-flight flag is cleared on every exit path by a drop guard, so a
//! panicking or failing pass can never wedge the scheduler.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bridge_traits::catalog::EntryService;
use bridge_traits::settings::SettingsStore;
use bridge_traits::time::{Clock, SystemClock};
use core_library::client::LibraryClient;
use core_runtime::events::{CoreEvent, EventBus, NoticeEvent, SyncEvent};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::attachments::AttachmentFetcher;
use crate::error::Result;
use crate::reconciler::{Reconciler, ReconcileOutcome};
use crate::settings::{self, SyncSettings};

/// Aggregate tally of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub added: usize,
    pub updated: usize,
    pub errors: usize,
}

/// Result of asking for a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAttempt {
    Completed(SyncOutcome),
    /// Another pass was in flight; the request was dropped with a
    /// notice, not an error.
    AlreadyRunning,
}

/// Clears the in-flight flag when the pass exits, however it exits.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Owns the periodic timer and runs sync passes.
pub struct SyncScheduler {
    service: Arc<dyn EntryService>,
    library: Arc<dyn LibraryClient>,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    staging_dir: PathBuf,
    in_flight: Arc<AtomicBool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(
        service: Arc<dyn EntryService>,
        library: Arc<dyn LibraryClient>,
        settings: Arc<dyn SettingsStore>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            service,
            library,
            settings,
            clock: Arc::new(SystemClock),
            events: EventBus::new(),
            staging_dir: staging_dir.into(),
            in_flight: Arc::new(AtomicBool::new(false)),
            timer: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Event bus carrying progress and notices; subscribe before
    /// triggering a sync to observe the full lifecycle.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn timer_active(&self) -> bool {
        self.timer.lock().await.is_some()
    }

    /// Run one pass now. Returns [`SyncAttempt::AlreadyRunning`] when a
    /// pass is in flight.
    pub async fn sync_now(&self) -> Result<SyncAttempt> {
        let _guard = match InFlightGuard::acquire(&self.in_flight) {
            Some(guard) => guard,
            None => {
                debug!("Sync requested while another pass is running");
                self.events
                    .publish(CoreEvent::Notice(NoticeEvent::SyncAlreadyRunning));
                return Ok(SyncAttempt::AlreadyRunning);
            }
        };

        match self.run_pass().await {
            Ok(outcome) => Ok(SyncAttempt::Completed(outcome)),
            Err(err) => {
                error!(error = %err, "Sync pass failed");
                self.events.publish(CoreEvent::Sync(SyncEvent::Failed {
                    message: err.to_string(),
                }));
                Err(err)
            }
        }
    }

    /// Install the periodic timer and run one immediate pass.
    ///
    /// Clears any prior timer first. An interval below the floor
    /// disables the timer; the immediate pass still runs. With sync
    /// disabled in settings, neither happens.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.stop().await;

        let config = SyncSettings::load(self.settings.as_ref()).await?;
        if !config.sync_enabled {
            info!("Sync disabled, not starting");
            return Ok(());
        }

        if let Some(period) = config.timer_interval() {
            // Weak capture: the timer task must not keep the scheduler
            // alive once every external handle is gone
            let scheduler = Arc::downgrade(self);
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // The first tick completes immediately; start() already
                // runs an immediate pass.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let Some(scheduler) = scheduler.upgrade() else {
                        break;
                    };
                    if let Err(err) = scheduler.sync_now().await {
                        warn!(error = %err, "Scheduled sync failed");
                    }
                }
            });
            *self.timer.lock().await = Some(handle);
            info!(period_secs = period.as_secs(), "Sync timer started");
        } else {
            info!(
                interval_minutes = config.interval_minutes,
                "Interval below floor, timer disabled"
            );
        }

        self.sync_now().await.map(|_| ())
    }

    /// Abort the periodic timer. A pass already in flight finishes.
    pub async fn stop(&self) {
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
            info!("Sync timer stopped");
        }
    }

    /// Re-read settings and reschedule; used after configuration
    /// changes.
    pub async fn restart(self: &Arc<Self>) -> Result<()> {
        self.stop().await;
        self.start().await
    }

    /// Fetch and reconcile a single entry by id, attachments included.
    /// Shares the in-flight flag with full passes; the watermark is not
    /// touched.
    pub async fn import_entry(&self, entry_id: u64) -> Result<SyncAttempt> {
        let _guard = match InFlightGuard::acquire(&self.in_flight) {
            Some(guard) => guard,
            None => {
                self.events
                    .publish(CoreEvent::Notice(NoticeEvent::SyncAlreadyRunning));
                return Ok(SyncAttempt::AlreadyRunning);
            }
        };

        let config = SyncSettings::load(self.settings.as_ref()).await?;
        let reconciler = Reconciler::new(Arc::clone(&self.library), config.server_url.clone());
        let fetcher = AttachmentFetcher::new(
            Arc::clone(&self.service),
            Arc::clone(&self.library),
            self.staging_dir.clone(),
        );

        let entry = self.service.fetch_entry(entry_id).await?;
        let outcome = reconciler.reconcile(&entry).await?;
        let mut tally = SyncOutcome::default();
        match &outcome {
            ReconcileOutcome::Created(_) => tally.added = 1,
            ReconcileOutcome::Updated(_) => tally.updated = 1,
        }

        let formats = config.download_policy.formats();
        for format in fetcher
            .attach(&outcome.record().id, entry.id, &formats)
            .await
        {
            self.events
                .publish(CoreEvent::Notice(NoticeEvent::AttachmentFailed {
                    entry_id: entry.id,
                    format: format.to_string(),
                }));
        }

        info!(entry_id, "Imported single entry");
        Ok(SyncAttempt::Completed(tally))
    }

    /// One pass: snapshot watermark, list, reconcile sequentially,
    /// attach, then advance the watermark to the pass start instant.
    /// Entry-level failures are counted; pass-level failures propagate
    /// and leave the watermark untouched.
    async fn run_pass(&self) -> Result<SyncOutcome> {
        let started = Instant::now();
        let pass_started_at = self.clock.unix_timestamp();

        let config = SyncSettings::load(self.settings.as_ref()).await?;
        let watermark = settings::load_watermark(self.settings.as_ref()).await?;
        let since = (watermark > 0).then_some(watermark);

        info!(?since, "Sync pass started");
        self.events.publish(CoreEvent::Sync(SyncEvent::Started {
            full: since.is_none(),
        }));

        let progress_bus = self.events.clone();
        let on_progress = move |fetched: usize, total: usize| {
            progress_bus.publish(CoreEvent::Sync(SyncEvent::Progress { fetched, total }));
        };
        let entries = self
            .service
            .list_all_entries(since, Some(&on_progress))
            .await?;

        let reconciler = Reconciler::new(Arc::clone(&self.library), config.server_url.clone());
        let fetcher = AttachmentFetcher::new(
            Arc::clone(&self.service),
            Arc::clone(&self.library),
            self.staging_dir.clone(),
        );
        let formats = config.download_policy.formats();

        let mut tally = SyncOutcome::default();
        for entry in &entries {
            let outcome = match reconciler.reconcile(entry).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(entry_id = entry.id, error = %err, "Entry reconcile failed");
                    tally.errors += 1;
                    continue;
                }
            };
            match &outcome {
                ReconcileOutcome::Created(_) => tally.added += 1,
                ReconcileOutcome::Updated(_) => tally.updated += 1,
            }

            for format in fetcher
                .attach(&outcome.record().id, entry.id, &formats)
                .await
            {
                self.events
                    .publish(CoreEvent::Notice(NoticeEvent::AttachmentFailed {
                        entry_id: entry.id,
                        format: format.to_string(),
                    }));
            }
        }

        settings::store_watermark(self.settings.as_ref(), pass_started_at).await?;

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            added = tally.added,
            updated = tally.updated,
            errors = tally.errors,
            duration_ms,
            "Sync pass finished"
        );
        self.events.publish(CoreEvent::Sync(SyncEvent::Completed {
            added: tally.added,
            updated: tally.updated,
            errors: tally.errors,
            duration_ms,
        }));

        Ok(tally)
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}
