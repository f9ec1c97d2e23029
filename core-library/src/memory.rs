//! In-memory [`LibraryClient`] used by tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::client::LibraryClient;
use crate::error::{LibraryError, Result};
use crate::record::{CollectionId, LocalRecord, NewRecord, RecordId};

#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub content_type: String,
    pub file_name: String,
}

#[derive(Default)]
struct State {
    next_id: u64,
    records: Vec<LocalRecord>,
    attachments: HashMap<String, Vec<StoredAttachment>>,
    collections: Vec<(CollectionId, String)>,
    memberships: Vec<(RecordId, CollectionId)>,
}

/// Library backed by process memory. Ids are assigned sequentially
/// starting at `"1"`.
#[derive(Default)]
pub struct MemoryLibrary {
    state: Mutex<State>,
    fail_attachments: bool,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variant whose [`attach_file`](LibraryClient::attach_file) always
    /// fails, for exercising attachment error paths.
    pub fn failing_attachments() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fail_attachments: true,
        }
    }

    /// Snapshot of every stored record.
    pub fn records(&self) -> Vec<LocalRecord> {
        self.state.lock().unwrap().records.clone()
    }

    /// Attachments stored on a record, in insertion order.
    pub fn attachments_for(&self, id: &RecordId) -> Vec<StoredAttachment> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .get(&id.0)
            .cloned()
            .unwrap_or_default()
    }

    /// Collection names a record belongs to.
    pub fn collections_of(&self, id: &RecordId) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .memberships
            .iter()
            .filter(|(record, _)| record == id)
            .filter_map(|(_, collection)| {
                state
                    .collections
                    .iter()
                    .find(|(c, _)| c == collection)
                    .map(|(_, name)| name.clone())
            })
            .collect()
    }
}

#[async_trait]
impl LibraryClient for MemoryLibrary {
    async fn search_extra(&self, fragment: &str) -> Result<Vec<LocalRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|record| record.fields.extra.contains(fragment))
            .cloned()
            .collect())
    }

    async fn create_record(&self, record: NewRecord) -> Result<LocalRecord> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = LocalRecord {
            id: RecordId(state.next_id.to_string()),
            fields: record.fields,
        };
        state.records.push(created.clone());
        Ok(created)
    }

    async fn update_record(&self, record: &LocalRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let stored = state
            .records
            .iter_mut()
            .find(|candidate| candidate.id == record.id)
            .ok_or_else(|| LibraryError::RecordNotFound {
                id: record.id.0.clone(),
            })?;
        stored.fields = record.fields.clone();
        Ok(())
    }

    async fn attachment_kinds(&self, id: &RecordId) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attachments
            .get(&id.0)
            .map(|list| {
                list.iter()
                    .map(|attachment| attachment.content_type.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn attach_file(&self, id: &RecordId, content_type: &str, path: &Path) -> Result<()> {
        if self.fail_attachments {
            return Err(LibraryError::Attachment("attachment store offline".into()));
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| LibraryError::Attachment(format!("bad path: {}", path.display())))?;

        let mut state = self.state.lock().unwrap();
        if !state.records.iter().any(|record| &record.id == id) {
            return Err(LibraryError::RecordNotFound { id: id.0.clone() });
        }
        state
            .attachments
            .entry(id.0.clone())
            .or_default()
            .push(StoredAttachment {
                content_type: content_type.to_string(),
                file_name,
            });
        Ok(())
    }

    async fn find_collection(&self, name: &str) -> Result<Option<CollectionId>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .collections
            .iter()
            .find(|(_, stored)| stored == name)
            .map(|(id, _)| id.clone()))
    }

    async fn create_collection(&self, name: &str) -> Result<CollectionId> {
        let mut state = self.state.lock().unwrap();
        let id = CollectionId(format!("c{}", state.collections.len() + 1));
        state.collections.push((id.clone(), name.to_string()));
        Ok(id)
    }

    async fn add_to_collection(&self, id: &RecordId, collection: &CollectionId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let membership = (id.clone(), collection.clone());
        if !state.memberships.contains(&membership) {
            state.memberships.push(membership);
        }
        Ok(())
    }
}
