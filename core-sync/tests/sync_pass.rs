//! End-to-end sync pass behavior against in-memory backends.

mod support;

use std::sync::Arc;

use bridge_desktop::settings::SqliteSettingsStore;
use bridge_traits::catalog::{EntryService, ExportFormat};
use bridge_traits::settings::SettingsStore;
use core_library::client::LibraryClient;
use core_library::matcher;
use core_library::memory::MemoryLibrary;
use core_library::record::{NewRecord, RecordFields};
use core_runtime::events::{CoreEvent, NoticeEvent, SyncEvent};
use core_sync::settings::{keys, load_watermark};
use core_sync::{SyncAttempt, SyncError, SyncScheduler};
use support::{entry, staging_dir, StubCatalog, SERVER_URL};

struct Harness {
    scheduler: Arc<SyncScheduler>,
    catalog: Arc<StubCatalog>,
    library: Arc<MemoryLibrary>,
    store: Arc<SqliteSettingsStore>,
}

async fn harness(catalog: StubCatalog) -> Harness {
    let store = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
    store
        .set_string(keys::SERVER_URL, SERVER_URL)
        .await
        .unwrap();

    let catalog = Arc::new(catalog);
    let library = Arc::new(MemoryLibrary::new());
    let scheduler = Arc::new(SyncScheduler::new(
        catalog.clone() as Arc<dyn EntryService>,
        library.clone() as Arc<dyn LibraryClient>,
        store.clone() as Arc<dyn SettingsStore>,
        staging_dir(),
    ));
    Harness {
        scheduler,
        catalog,
        library,
        store,
    }
}

fn completed(attempt: SyncAttempt) -> core_sync::SyncOutcome {
    match attempt {
        SyncAttempt::Completed(outcome) => outcome,
        SyncAttempt::AlreadyRunning => panic!("unexpected AlreadyRunning"),
    }
}

#[tokio::test]
async fn first_sync_creates_marked_record() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;

    let outcome = completed(h.scheduler.sync_now().await.unwrap());
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.errors, 0);

    let records = h.library.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.fields.title, "Foo");
    assert_eq!(record.fields.sort_key, "42");
    assert!(record.fields.extra.contains("External ID: 42"));
    assert_eq!(record.fields.tags, vec!["x", "Starred"]);

    assert!(load_watermark(h.store.as_ref()).await.unwrap() > 0);
}

#[tokio::test]
async fn second_pass_is_idempotent_and_incremental() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;

    completed(h.scheduler.sync_now().await.unwrap());
    let watermark = load_watermark(h.store.as_ref()).await.unwrap();
    assert!(watermark > 0);

    let outcome = completed(h.scheduler.sync_now().await.unwrap());
    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.updated, 1);

    // Incremental: the second listing passed the stored watermark
    assert_eq!(
        *h.catalog.last_since.lock().unwrap(),
        Some(Some(watermark))
    );

    let records = h.library.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields.extra.matches("External ID: 42").count(), 1);
}

#[tokio::test]
async fn remote_title_change_propagates() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;
    completed(h.scheduler.sync_now().await.unwrap());

    let mut changed = entry(42);
    changed.title = "Foo2".to_string();
    h.catalog.replace_entries(vec![changed]);

    completed(h.scheduler.sync_now().await.unwrap());
    let records = h.library.records();
    assert_eq!(records[0].fields.title, "Foo2");
    assert_eq!(records[0].fields.extra.matches("External ID: 42").count(), 1);
}

#[tokio::test]
async fn listing_failure_leaves_watermark_untouched() {
    let h = harness(StubCatalog::failing_listing()).await;
    h.store.set_i64(keys::LAST_SYNC, 1_700_000_000).await.unwrap();
    let mut events = h.scheduler.events().subscribe();

    let err = h.scheduler.sync_now().await.unwrap_err();
    assert!(matches!(err, SyncError::Transport { status: 503, .. }));
    assert_eq!(
        load_watermark(h.store.as_ref()).await.unwrap(),
        1_700_000_000
    );

    // Started then Failed, no Completed
    let mut saw_failed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => saw_failed = true,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => panic!("pass must not complete"),
            _ => {}
        }
    }
    assert!(saw_failed);
}

#[tokio::test]
async fn concurrent_sync_is_rejected_with_notice() {
    let h = harness(StubCatalog::gated(vec![entry(42)])).await;
    let mut events = h.scheduler.events().subscribe();

    let background = {
        let scheduler = h.scheduler.clone();
        tokio::spawn(async move { scheduler.sync_now().await })
    };
    h.catalog.gate().listing_started.notified().await;

    let attempt = h.scheduler.sync_now().await.unwrap();
    assert_eq!(attempt, SyncAttempt::AlreadyRunning);

    h.catalog.gate().release.notify_one();
    let outcome = completed(background.await.unwrap().unwrap());
    assert_eq!(outcome.added, 1);
    assert!(!h.scheduler.is_running());

    let mut saw_notice = false;
    while let Ok(event) = events.try_recv() {
        if event == CoreEvent::Notice(NoticeEvent::SyncAlreadyRunning) {
            saw_notice = true;
        }
    }
    assert!(saw_notice);
}

#[tokio::test]
async fn full_catalog_walk_visits_every_page() {
    let pages = vec![
        vec![entry(1), entry(2)],
        vec![entry(3), entry(4)],
        vec![entry(5), entry(6)],
    ];
    let h = harness(StubCatalog::with_pages(pages)).await;
    let mut events = h.scheduler.events().subscribe();

    let outcome = completed(h.scheduler.sync_now().await.unwrap());
    assert_eq!(outcome.added, 6);
    assert_eq!(h.catalog.list_calls.load(std::sync::atomic::Ordering::SeqCst), 3);

    let mut progress = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Sync(SyncEvent::Progress { fetched, total }) = event {
            progress.push((fetched, total));
        }
    }
    assert_eq!(progress, vec![(2, 6), (4, 6), (6, 6)]);
}

#[tokio::test]
async fn existing_attachment_kind_is_not_downloaded_again() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;
    h.store
        .set_bool(keys::DOWNLOAD_PDF_LEGACY, true)
        .await
        .unwrap();

    // Record already holds a pdf-kind attachment
    let record = h
        .library
        .create_record(NewRecord {
            fields: RecordFields {
                extra: matcher::marker_block(SERVER_URL, 42),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    h.library
        .attach_file(&record.id, "application/pdf", std::path::Path::new("seed.pdf"))
        .await
        .unwrap();

    let outcome = completed(h.scheduler.sync_now().await.unwrap());
    assert_eq!(outcome.updated, 1);
    assert_eq!(
        h.catalog.export_calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    assert_eq!(h.library.attachments_for(&record.id).len(), 1);
}

#[tokio::test]
async fn attachment_failure_is_isolated_and_noticed() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;
    h.store
        .set_bool(&keys::download_format(ExportFormat::Pdf), true)
        .await
        .unwrap();
    h.store
        .set_bool(&keys::download_format(ExportFormat::Epub), true)
        .await
        .unwrap();
    h.catalog.fail_export(ExportFormat::Pdf);
    let mut events = h.scheduler.events().subscribe();

    let outcome = completed(h.scheduler.sync_now().await.unwrap());
    // The record itself synced; the failed format is omitted
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.errors, 0);

    let record = &h.library.records()[0];
    let stored = h.library.attachments_for(&record.id);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content_type, "application/epub+zip");

    let mut noticed = false;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Notice(NoticeEvent::AttachmentFailed { entry_id, format }) = event {
            assert_eq!(entry_id, 42);
            assert_eq!(format, "pdf");
            noticed = true;
        }
    }
    assert!(noticed);
}

#[tokio::test]
async fn import_entry_creates_without_moving_watermark() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;

    let outcome = completed(h.scheduler.import_entry(42).await.unwrap());
    assert_eq!(outcome.added, 1);
    assert_eq!(h.library.records().len(), 1);
    assert_eq!(load_watermark(h.store.as_ref()).await.unwrap(), 0);

    // Re-importing resolves to an update
    let outcome = completed(h.scheduler.import_entry(42).await.unwrap());
    assert_eq!(outcome.updated, 1);
    assert_eq!(h.library.records().len(), 1);
}

#[tokio::test]
async fn import_entry_rejected_while_sync_running() {
    let h = harness(StubCatalog::gated(vec![entry(42)])).await;

    let background = {
        let scheduler = h.scheduler.clone();
        tokio::spawn(async move { scheduler.sync_now().await })
    };
    h.catalog.gate().listing_started.notified().await;

    let attempt = h.scheduler.import_entry(42).await.unwrap();
    assert_eq!(attempt, SyncAttempt::AlreadyRunning);

    h.catalog.gate().release.notify_one();
    completed(background.await.unwrap().unwrap());
    assert!(!h.scheduler.is_running());
}

#[tokio::test]
async fn scheduler_is_freed_after_last_handle_dropped() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;
    h.store
        .set_i64(keys::SYNC_INTERVAL_MINUTES, 60)
        .await
        .unwrap();

    h.scheduler.start().await.unwrap();
    assert!(h.scheduler.timer_active().await);

    // The running timer task must not hold the scheduler alive
    let weak = std::sync::Arc::downgrade(&h.scheduler);
    drop(h);
    assert!(weak.upgrade().is_none());
}

#[tokio::test]
async fn start_below_interval_floor_runs_pass_without_timer() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;
    h.store
        .set_i64(keys::SYNC_INTERVAL_MINUTES, 5)
        .await
        .unwrap();

    h.scheduler.start().await.unwrap();
    assert!(!h.scheduler.timer_active().await);
    assert_eq!(h.library.records().len(), 1);
}

#[tokio::test]
async fn start_with_sync_disabled_does_nothing() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;
    h.store.set_bool(keys::SYNC_ENABLED, false).await.unwrap();

    h.scheduler.start().await.unwrap();
    assert!(!h.scheduler.timer_active().await);
    assert_eq!(
        h.catalog.list_calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn start_installs_timer_and_stop_clears_it() {
    let h = harness(StubCatalog::with_entries(vec![entry(42)])).await;
    h.store
        .set_i64(keys::SYNC_INTERVAL_MINUTES, 60)
        .await
        .unwrap();

    h.scheduler.start().await.unwrap();
    assert!(h.scheduler.timer_active().await);
    assert_eq!(h.library.records().len(), 1);

    h.scheduler.stop().await;
    assert!(!h.scheduler.timer_active().await);
}
