//! Local library client trait
//!
//! Abstract contract for the reference-manager library the engine
//! writes into. Mirrors what the engine actually needs: marker search,
//! create/update, attachment management and collections — nothing more.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::record::{CollectionId, LocalRecord, NewRecord, RecordId};

/// Client for the local reference-manager library.
///
/// All mutation is record-granular; the engine never performs bulk
/// operations. Implementations must be safe to share behind `Arc`.
#[async_trait]
pub trait LibraryClient: Send + Sync {
    /// Substring search over the free-text metadata field.
    ///
    /// This is raw containment as provided by the backing store; callers
    /// needing token-exact semantics filter the results themselves.
    async fn search_extra(&self, fragment: &str) -> Result<Vec<LocalRecord>>;

    /// Persist a new record, returning it with its assigned id.
    async fn create_record(&self, record: NewRecord) -> Result<LocalRecord>;

    /// Overwrite the stored fields of an existing record.
    async fn update_record(&self, record: &LocalRecord) -> Result<()>;

    /// Content-kind labels of the attachments currently on a record.
    async fn attachment_kinds(&self, id: &RecordId) -> Result<Vec<String>>;

    /// Attach the file at `path` to a record with the given
    /// content-kind label. The library copies the payload; the caller
    /// may remove `path` afterwards.
    async fn attach_file(&self, id: &RecordId, content_type: &str, path: &Path) -> Result<()>;

    /// Look up a collection by exact name.
    async fn find_collection(&self, name: &str) -> Result<Option<CollectionId>>;

    /// Create a collection with the given name.
    async fn create_collection(&self, name: &str) -> Result<CollectionId>;

    /// Add a record to a collection. Adding twice is a no-op.
    async fn add_to_collection(&self, id: &RecordId, collection: &CollectionId) -> Result<()>;
}
