//! Shared test doubles for the integration suite.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bridge_traits::catalog::{
    EntriesPage, EntryService, ExportFormat, RemoteEntry, ServerInfo,
};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bytes::Bytes;
use tokio::sync::Notify;
use uuid::Uuid;

pub const SERVER_URL: &str = "https://wb.example";

pub fn entry(id: u64) -> RemoteEntry {
    RemoteEntry {
        id,
        title: "Foo".to_string(),
        url: "http://x".to_string(),
        created_at: Some(1_704_067_200), // 2024-01-01T00:00:00Z
        updated_at: Some(1_704_067_200),
        domain_name: Some("x".to_string()),
        content: None,
        authors: vec!["Jane Doe".to_string()],
        tags: vec!["x".to_string()],
        is_starred: true,
        is_archived: false,
    }
}

pub fn staging_dir() -> PathBuf {
    std::env::temp_dir().join(format!("sync-test-{}", Uuid::new_v4()))
}

/// In-memory catalog with switchable failure modes and call counters.
pub struct StubCatalog {
    pages: Mutex<Vec<Vec<RemoteEntry>>>,
    pub list_calls: AtomicUsize,
    pub export_calls: AtomicUsize,
    pub last_since: Mutex<Option<Option<i64>>>,
    fail_listing: bool,
    fail_exports: Mutex<HashSet<ExportFormat>>,
    /// When set, listing blocks until [`release`](Self::release) and
    /// signals `listing_started` first.
    gate: Option<Gate>,
}

pub struct Gate {
    pub listing_started: Notify,
    pub release: Notify,
}

impl StubCatalog {
    pub fn with_entries(entries: Vec<RemoteEntry>) -> Self {
        Self::with_pages(vec![entries])
    }

    pub fn with_pages(pages: Vec<Vec<RemoteEntry>>) -> Self {
        Self {
            pages: Mutex::new(pages),
            list_calls: AtomicUsize::new(0),
            export_calls: AtomicUsize::new(0),
            last_since: Mutex::new(None),
            fail_listing: false,
            fail_exports: Mutex::new(HashSet::new()),
            gate: None,
        }
    }

    pub fn failing_listing() -> Self {
        let mut stub = Self::with_pages(Vec::new());
        stub.fail_listing = true;
        stub
    }

    pub fn gated(entries: Vec<RemoteEntry>) -> Self {
        let mut stub = Self::with_entries(entries);
        stub.gate = Some(Gate {
            listing_started: Notify::new(),
            release: Notify::new(),
        });
        stub
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("stub built without gate")
    }

    pub fn fail_export(&self, format: ExportFormat) {
        self.fail_exports.lock().unwrap().insert(format);
    }

    pub fn replace_entries(&self, entries: Vec<RemoteEntry>) {
        *self.pages.lock().unwrap() = vec![entries];
    }
}

#[async_trait]
impl EntryService for StubCatalog {
    async fn list_entries_page(
        &self,
        since: Option<i64>,
        page: u32,
        _per_page: u32,
    ) -> BridgeResult<EntriesPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_since.lock().unwrap() = Some(since);

        if let Some(gate) = &self.gate {
            gate.listing_started.notify_one();
            gate.release.notified().await;
        }
        if self.fail_listing {
            return Err(BridgeError::Transport {
                status: 503,
                body: "listing unavailable".into(),
            });
        }

        let (items, pages, total) = {
            let stored = self.pages.lock().unwrap();
            let total = stored.iter().map(Vec::len).sum();
            let pages = stored.len().max(1) as u32;
            let items = stored
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default();
            (items, pages, total)
        };

        Ok(EntriesPage {
            items,
            page,
            pages,
            total,
        })
    }

    async fn fetch_entry(&self, id: u64) -> BridgeResult<RemoteEntry> {
        let stored = self.pages.lock().unwrap();
        stored
            .iter()
            .flatten()
            .find(|entry| entry.id == id)
            .cloned()
            .ok_or(BridgeError::Transport {
                status: 404,
                body: "entry not found".into(),
            })
    }

    async fn fetch_export(&self, _id: u64, format: ExportFormat) -> BridgeResult<Bytes> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exports.lock().unwrap().contains(&format) {
            return Err(BridgeError::Transport {
                status: 500,
                body: "render failed".into(),
            });
        }
        Ok(Bytes::from(format!("export.{}", format)))
    }

    async fn server_info(&self) -> BridgeResult<ServerInfo> {
        Ok(ServerInfo {
            appname: "wallabag".to_string(),
            version: "2.6.9".to_string(),
            allowed_registration: false,
        })
    }
}
