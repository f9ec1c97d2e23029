//! Create-or-update merge of remote entries into library records.

use std::sync::Arc;

use bridge_traits::catalog::RemoteEntry;
use chrono::{DateTime, Utc};
use core_library::client::LibraryClient;
use core_library::matcher::{self, RecordMatcher};
use core_library::record::{Creator, LocalRecord, NewRecord, RecordFields, RecordId};
use tracing::{debug, instrument, warn};

use crate::error::Result;

/// Name of the collection new records are filed under.
pub const DEFAULT_COLLECTION_NAME: &str = "wallabag";

/// Tag added locally when the remote entry is starred.
pub const STARRED_TAG: &str = "Starred";

/// What a reconcile did, carrying the resulting record.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    Created(LocalRecord),
    Updated(LocalRecord),
}

impl ReconcileOutcome {
    pub fn record(&self) -> &LocalRecord {
        match self {
            ReconcileOutcome::Created(record) | ReconcileOutcome::Updated(record) => record,
        }
    }
}

/// Merges one remote entry into the local library.
///
/// Remote wins field-by-field with one exception: empty remote title or
/// url never overwrites a local value. Tags and creators are replaced
/// wholesale, never diffed.
pub struct Reconciler {
    library: Arc<dyn LibraryClient>,
    matcher: RecordMatcher,
    server_url: String,
    collection_name: String,
}

impl Reconciler {
    pub fn new(library: Arc<dyn LibraryClient>, server_url: impl Into<String>) -> Self {
        let matcher = RecordMatcher::new(Arc::clone(&library));
        Self {
            library,
            matcher,
            server_url: server_url.into(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
        }
    }

    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    #[instrument(skip(self, entry), fields(entry_id = entry.id))]
    pub async fn reconcile(&self, entry: &RemoteEntry) -> Result<ReconcileOutcome> {
        match self.matcher.find_local_record(entry.id).await? {
            None => self.create(entry).await,
            Some(record) => self.update(entry, record).await,
        }
    }

    async fn create(&self, entry: &RemoteEntry) -> Result<ReconcileOutcome> {
        let (date, date_added) = entry_dates(entry);
        let fields = RecordFields {
            title: entry.title.clone(),
            url: entry.url.clone(),
            date,
            date_added,
            website: entry.domain_name.clone(),
            sort_key: entry.id.to_string(),
            extra: matcher::marker_block(&self.server_url, entry.id),
            creators: build_creators(entry),
            tags: build_tags(entry),
        };

        let record = self.library.create_record(NewRecord { fields }).await?;
        debug!(record_id = %record.id, "Created record");
        self.assign_collection(&record.id).await;
        Ok(ReconcileOutcome::Created(record))
    }

    async fn update(&self, entry: &RemoteEntry, mut record: LocalRecord) -> Result<ReconcileOutcome> {
        if !entry.title.is_empty() {
            record.fields.title = entry.title.clone();
        }
        if !entry.url.is_empty() {
            record.fields.url = entry.url.clone();
        }
        let (date, date_added) = entry_dates(entry);
        if date_added.is_some() {
            record.fields.date = date;
            record.fields.date_added = date_added;
        }
        if let Some(domain) = entry.domain_name.as_deref().filter(|d| !d.is_empty()) {
            record.fields.website = Some(domain.to_string());
        }
        record.fields.sort_key = entry.id.to_string();
        record.fields.extra = ensure_marker(&record.fields.extra, &self.server_url, entry.id);
        record.fields.creators = build_creators(entry);
        record.fields.tags = build_tags(entry);

        self.library.update_record(&record).await?;
        debug!(record_id = %record.id, "Updated record");
        Ok(ReconcileOutcome::Updated(record))
    }

    /// Best-effort filing into the named collection. Failure never
    /// fails the reconcile.
    async fn assign_collection(&self, record_id: &RecordId) {
        let outcome = async {
            let collection = match self.library.find_collection(&self.collection_name).await? {
                Some(existing) => existing,
                None => self.library.create_collection(&self.collection_name).await?,
            };
            self.library.add_to_collection(record_id, &collection).await
        }
        .await;

        if let Err(err) = outcome {
            warn!(
                record_id = %record_id,
                collection = %self.collection_name,
                error = %err,
                "Collection assignment failed"
            );
        }
    }
}

/// `(calendar date, Unix seconds)` from the remote creation timestamp.
fn entry_dates(entry: &RemoteEntry) -> (String, Option<i64>) {
    match entry.created_at.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)) {
        Some(created) => (created.format("%Y-%m-%d").to_string(), Some(created.timestamp())),
        None => (String::new(), None),
    }
}

fn build_tags(entry: &RemoteEntry) -> Vec<String> {
    let mut tags = entry.tags.clone();
    if entry.is_starred && !tags.iter().any(|tag| tag == STARRED_TAG) {
        tags.push(STARRED_TAG.to_string());
    }
    tags
}

fn build_creators(entry: &RemoteEntry) -> Vec<Creator> {
    entry
        .authors
        .iter()
        .map(|author| author.trim())
        .filter(|author| !author.is_empty())
        .map(Creator::from_full_name)
        .collect()
}

/// Rebuild the metadata field: legacy markers stripped, marker and
/// deep-link lines appended only when absent.
fn ensure_marker(extra: &str, server_url: &str, external_id: u64) -> String {
    let mut out = matcher::strip_legacy_markers(extra).trim_end().to_string();

    if !matcher::contains_marker(&out, external_id) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&matcher::marker_line(external_id));
    }

    let link = matcher::link_line(server_url, external_id);
    if !out.contains(&link) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&link);
    }

    out
}
