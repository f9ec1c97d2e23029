//! Export download and attachment of rendered entry formats.
//!
//! Downloads go through a staging file so the library only ever sees a
//! complete payload on disk. The staging file is removed on every exit
//! path, success or failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::catalog::{EntryService, ExportFormat};
use core_library::client::LibraryClient;
use core_library::record::RecordId;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Deletes the staged file when dropped.
struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    async fn write(dir: &Path, entry_id: u64, format: ExportFormat, bytes: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!(
            "entry-{}-{}.{}",
            entry_id,
            Uuid::new_v4(),
            format.as_str()
        ));
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "Failed to remove staging file");
        }
    }
}

/// Fetches rendered exports and attaches them to library records.
pub struct AttachmentFetcher {
    service: Arc<dyn EntryService>,
    library: Arc<dyn LibraryClient>,
    staging_dir: PathBuf,
}

impl AttachmentFetcher {
    pub fn new(
        service: Arc<dyn EntryService>,
        library: Arc<dyn LibraryClient>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            service,
            library,
            staging_dir: staging_dir.into(),
        }
    }

    /// Attach each enabled format to a record, skipping formats whose
    /// content-kind the record already carries. Per-format failures are
    /// logged and returned; they never abort sibling formats.
    #[instrument(skip(self, formats))]
    pub async fn attach(
        &self,
        record_id: &RecordId,
        entry_id: u64,
        formats: &[ExportFormat],
    ) -> Vec<ExportFormat> {
        if formats.is_empty() {
            return Vec::new();
        }

        let existing = match self.library.attachment_kinds(record_id).await {
            Ok(kinds) => kinds,
            Err(err) => {
                warn!(record_id = %record_id, error = %err, "Could not list attachments");
                return formats.to_vec();
            }
        };

        let mut failed = Vec::new();
        for &format in formats {
            if existing.iter().any(|kind| kind == format.media_type()) {
                debug!(record_id = %record_id, %format, "Attachment already present, skipping");
                continue;
            }
            if let Err(err) = self.attach_one(record_id, entry_id, format).await {
                warn!(record_id = %record_id, %format, error = %err, "Attachment failed");
                failed.push(format);
            }
        }
        failed
    }

    async fn attach_one(
        &self,
        record_id: &RecordId,
        entry_id: u64,
        format: ExportFormat,
    ) -> crate::error::Result<()> {
        let bytes = self.service.fetch_export(entry_id, format).await?;
        let staged = StagedFile::write(&self.staging_dir, entry_id, format, &bytes).await?;
        self.library
            .attach_file(record_id, format.media_type(), &staged.path)
            .await?;
        debug!(record_id = %record_id, %format, size = bytes.len(), "Attached export");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::catalog::{EntriesPage, RemoteEntry, ServerInfo};
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bytes::Bytes;
    use core_library::memory::MemoryLibrary;
    use core_library::record::NewRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubExports {
        export_calls: AtomicUsize,
        fail: bool,
    }

    impl StubExports {
        fn new(fail: bool) -> Self {
            Self {
                export_calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl EntryService for StubExports {
        async fn list_entries_page(
            &self,
            _since: Option<i64>,
            _page: u32,
            _per_page: u32,
        ) -> BridgeResult<EntriesPage> {
            unimplemented!()
        }

        async fn fetch_entry(&self, _id: u64) -> BridgeResult<RemoteEntry> {
            unimplemented!()
        }

        async fn fetch_export(&self, _id: u64, _format: ExportFormat) -> BridgeResult<Bytes> {
            self.export_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(BridgeError::Transport {
                    status: 500,
                    body: "render failed".into(),
                })
            } else {
                Ok(Bytes::from_static(b"%PDF-1.4"))
            }
        }

        async fn server_info(&self) -> BridgeResult<ServerInfo> {
            unimplemented!()
        }
    }

    fn staging_dir() -> PathBuf {
        std::env::temp_dir().join(format!("attach-test-{}", Uuid::new_v4()))
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn attaches_and_removes_staging_file() {
        let library = Arc::new(MemoryLibrary::new());
        let record = library.create_record(NewRecord::default()).await.unwrap();
        let service = Arc::new(StubExports::new(false));
        let dir = staging_dir();

        let fetcher = AttachmentFetcher::new(service.clone(), library.clone(), &dir);
        let failed = fetcher
            .attach(&record.id, 42, &[ExportFormat::Pdf])
            .await;

        assert!(failed.is_empty());
        let stored = library.attachments_for(&record.id);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content_type, "application/pdf");
        assert!(stored[0].file_name.ends_with(".pdf"));
        assert_eq!(staged_files(&dir), 0);
    }

    #[tokio::test]
    async fn skips_format_already_attached() {
        let library = Arc::new(MemoryLibrary::new());
        let record = library.create_record(NewRecord::default()).await.unwrap();
        library
            .attach_file(&record.id, "application/pdf", Path::new("seed.pdf"))
            .await
            .unwrap();
        let service = Arc::new(StubExports::new(false));

        let fetcher = AttachmentFetcher::new(service.clone(), library.clone(), staging_dir());
        let failed = fetcher
            .attach(&record.id, 42, &[ExportFormat::Pdf, ExportFormat::Epub])
            .await;

        assert!(failed.is_empty());
        // Only the epub was downloaded
        assert_eq!(service.export_calls.load(Ordering::SeqCst), 1);
        assert_eq!(library.attachments_for(&record.id).len(), 2);
    }

    #[tokio::test]
    async fn staging_file_removed_when_attach_fails() {
        let library = Arc::new(MemoryLibrary::failing_attachments());
        let record = library.create_record(NewRecord::default()).await.unwrap();
        let service = Arc::new(StubExports::new(false));
        let dir = staging_dir();

        let fetcher = AttachmentFetcher::new(service, library, &dir);
        let failed = fetcher.attach(&record.id, 7, &[ExportFormat::Pdf]).await;

        assert_eq!(failed, vec![ExportFormat::Pdf]);
        assert_eq!(staged_files(&dir), 0);
    }

    #[tokio::test]
    async fn export_failure_does_not_abort_sibling_formats() {
        let library = Arc::new(MemoryLibrary::new());
        let record = library.create_record(NewRecord::default()).await.unwrap();
        let service = Arc::new(StubExports::new(true));

        let fetcher = AttachmentFetcher::new(service.clone(), library.clone(), staging_dir());
        let failed = fetcher
            .attach(&record.id, 7, &[ExportFormat::Pdf, ExportFormat::Txt])
            .await;

        assert_eq!(failed, vec![ExportFormat::Pdf, ExportFormat::Txt]);
        assert_eq!(service.export_calls.load(Ordering::SeqCst), 2);
        assert!(library.attachments_for(&record.id).is_empty());
    }
}
