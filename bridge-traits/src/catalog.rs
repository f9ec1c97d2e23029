//! Remote Entry Catalog Abstraction
//!
//! Contract between the sync engine and a remote read-it-later service.
//! The engine only ever talks to `dyn EntryService`; the concrete HTTP
//! client lives in a provider crate.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default page size used when walking the full catalog.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// One article-like item in the remote catalog.
///
/// Produced by the remote service and never mutated locally. Timestamps
/// are Unix epoch seconds; the provider is responsible for parsing
/// whatever wire format the service uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Immutable, globally unique id within the remote account.
    pub id: u64,
    pub title: String,
    pub url: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    /// Origin domain of the saved page.
    pub domain_name: Option<String>,
    /// Free-text content body (ignored by the engine, kept for export).
    pub content: Option<String>,
    /// Author name strings, possibly empty.
    pub authors: Vec<String>,
    /// Tag labels.
    pub tags: Vec<String>,
    pub is_starred: bool,
    pub is_archived: bool,
}

/// Export formats the remote service can render an entry into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Epub,
    Xml,
    Json,
    Txt,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 6] = [
        ExportFormat::Pdf,
        ExportFormat::Epub,
        ExportFormat::Xml,
        ExportFormat::Json,
        ExportFormat::Txt,
        ExportFormat::Csv,
    ];

    /// Extension string used in export URLs and staged file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Epub => "epub",
            ExportFormat::Xml => "xml",
            ExportFormat::Json => "json",
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
        }
    }

    /// Media type used as the attachment content-kind label.
    pub fn media_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Epub => "application/epub+zip",
            ExportFormat::Xml => "application/xml",
            ExportFormat::Json => "application/json",
            ExportFormat::Txt => "text/plain",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(ExportFormat::Pdf),
            "epub" => Ok(ExportFormat::Epub),
            "xml" => Ok(ExportFormat::Xml),
            "json" => Ok(ExportFormat::Json),
            "txt" => Ok(ExportFormat::Txt),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("Unknown export format: {}", other)),
        }
    }
}

/// One page of catalog listing results.
#[derive(Debug, Clone)]
pub struct EntriesPage {
    pub items: Vec<RemoteEntry>,
    /// 1-based page index this response corresponds to.
    pub page: u32,
    /// Total number of pages for the query.
    pub pages: u32,
    /// Total number of entries for the query.
    pub total: usize,
}

/// Remote service identity, used as a connectivity probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub appname: String,
    pub version: String,
    #[serde(default)]
    pub allowed_registration: bool,
}

/// Progress callback invoked after each fetched page with
/// `(entries_fetched_so_far, total_entries)`.
pub type PageProgress = dyn Fn(usize, usize) + Send + Sync;

/// Remote entry catalog client.
///
/// Implementations authenticate per call; the engine never sees tokens.
/// Failures carry the triggering HTTP status and response body for
/// diagnostics. Nothing is retried at this layer.
#[async_trait]
pub trait EntryService: Send + Sync {
    /// Fetch one page of entries changed since `since` (Unix seconds),
    /// newest-updated first. `since = None` lists the full catalog.
    async fn list_entries_page(
        &self,
        since: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<EntriesPage>;

    /// Fetch a single entry by id.
    async fn fetch_entry(&self, id: u64) -> Result<RemoteEntry>;

    /// Download the rendered export of an entry in the given format.
    async fn fetch_export(&self, id: u64, format: ExportFormat) -> Result<Bytes>;

    /// Probe the service for its identity (connectivity check).
    async fn server_info(&self) -> Result<ServerInfo>;

    /// Walk every page of entries changed since `since`, concatenating
    /// results in server order.
    ///
    /// Iteration is bounded by the first response's page count; exactly
    /// `pages` page requests are issued. `on_progress` fires after each
    /// page.
    async fn list_all_entries(
        &self,
        since: Option<i64>,
        on_progress: Option<&PageProgress>,
    ) -> Result<Vec<RemoteEntry>> {
        let first = self
            .list_entries_page(since, 1, DEFAULT_PAGE_SIZE)
            .await?;
        let total_pages = first.pages;
        let total = first.total;
        let mut entries = first.items;

        if let Some(progress) = on_progress {
            progress(entries.len(), total);
        }

        for page in 2..=total_pages {
            let next = self
                .list_entries_page(since, page, DEFAULT_PAGE_SIZE)
                .await?;
            entries.extend(next.items);

            if let Some(progress) = on_progress {
                progress(entries.len(), total);
            }
        }

        Ok(entries)
    }
}
