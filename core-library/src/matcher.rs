//! External-id marker grammar and record matching
//!
//! A local record is tied to its remote entry through a marker block in
//! the free-text metadata field:
//!
//! ```text
//! External ID: 42
//! Wallabag link: https://wb.example/view/42
//! ```
//!
//! Matching is token-exact: id `12` must not match the marker
//! `External ID: 123`. The backing store only offers raw substring
//! search, so [`RecordMatcher`] re-filters candidates with a digit
//! boundary check.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::client::LibraryClient;
use crate::error::Result;
use crate::record::LocalRecord;

/// Prefix of the marker line embedded in the metadata field.
pub const MARKER_PREFIX: &str = "External ID: ";

/// Marker line for an external id.
pub fn marker_line(external_id: u64) -> String {
    format!("{}{}", MARKER_PREFIX, external_id)
}

/// Deep-link line pointing back at the remote entry.
pub fn link_line(server_url: &str, external_id: u64) -> String {
    format!(
        "Wallabag link: {}/view/{}",
        server_url.trim_end_matches('/'),
        external_id
    )
}

/// Full marker block written into a freshly created record.
pub fn marker_block(server_url: &str, external_id: u64) -> String {
    format!(
        "{}\n{}",
        marker_line(external_id),
        link_line(server_url, external_id)
    )
}

/// Token-exact marker containment.
///
/// True only when the metadata text contains `External ID: <id>` with
/// no further digit after the id, so ids that are numeric prefixes of
/// one another never cross-match.
pub fn contains_marker(extra: &str, external_id: u64) -> bool {
    let needle = marker_line(external_id);
    let mut offset = 0;

    while let Some(pos) = extra[offset..].find(&needle) {
        let end = offset + pos + needle.len();
        match extra[end..].chars().next() {
            Some(c) if c.is_ascii_digit() => {
                // Marker of a longer id; keep scanning
                offset = offset + pos + 1;
            }
            _ => return true,
        }
    }

    false
}

fn legacy_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^Wallabag ID:[ \t]*\d+[ \t]*\n?").expect("legacy marker regex")
    })
}

/// Remove marker lines written by earlier releases (`Wallabag ID: <id>`).
pub fn strip_legacy_markers(extra: &str) -> String {
    legacy_marker_re().replace_all(extra, "").into_owned()
}

/// Resolves remote entries to their local records via the marker.
pub struct RecordMatcher {
    library: Arc<dyn LibraryClient>,
}

impl RecordMatcher {
    pub fn new(library: Arc<dyn LibraryClient>) -> Self {
        Self { library }
    }

    /// Find the local record owned by `external_id`, if any.
    ///
    /// Returns at most one record. When duplicates exist the first
    /// candidate wins; the rest are ignored.
    pub async fn find_local_record(&self, external_id: u64) -> Result<Option<LocalRecord>> {
        let candidates = self.library.search_extra(&marker_line(external_id)).await?;
        let mut matches = candidates
            .into_iter()
            .filter(|record| contains_marker(&record.fields.extra, external_id));

        let found = matches.next();
        let ignored = matches.count();
        if ignored > 0 {
            debug!(external_id, ignored, "Ignoring duplicate marker matches");
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLibrary;
    use crate::record::{NewRecord, RecordFields};

    #[test]
    fn marker_block_composes_both_lines() {
        let block = marker_block("https://wb.example/", 42);
        assert_eq!(
            block,
            "External ID: 42\nWallabag link: https://wb.example/view/42"
        );
    }

    #[test]
    fn contains_marker_matches_exact_token() {
        assert!(contains_marker("External ID: 42", 42));
        assert!(contains_marker("External ID: 42\nWallabag link: x", 42));
        assert!(contains_marker("notes\nExternal ID: 42", 42));
    }

    /// The reference behavior was raw substring containment, which lets
    /// id 12 claim the record of id 123. Token-exact matching is a
    /// deliberate divergence.
    #[test]
    fn prefix_id_does_not_match() {
        assert!(!contains_marker("External ID: 123", 12));
        assert!(!contains_marker("External ID: 1234\nWallabag link: x", 123));
    }

    #[test]
    fn contains_marker_skips_longer_id_then_finds_exact() {
        let extra = "External ID: 123\nExternal ID: 12";
        assert!(contains_marker(extra, 12));
        assert!(contains_marker(extra, 123));
        assert!(!contains_marker(extra, 1));
    }

    #[test]
    fn strip_legacy_markers_removes_old_lines_only() {
        let extra = "Wallabag ID: 42\nExternal ID: 42\nWallabag link: x";
        assert_eq!(
            strip_legacy_markers(extra),
            "External ID: 42\nWallabag link: x"
        );

        // Untouched when no legacy line present
        assert_eq!(strip_legacy_markers("External ID: 7"), "External ID: 7");
    }

    #[tokio::test]
    async fn matcher_returns_first_of_duplicates() {
        let library = Arc::new(MemoryLibrary::new());
        for _ in 0..2 {
            library
                .create_record(NewRecord {
                    fields: RecordFields {
                        extra: marker_block("https://wb.example", 42),
                        ..Default::default()
                    },
                })
                .await
                .unwrap();
        }

        let matcher = RecordMatcher::new(library);
        let found = matcher.find_local_record(42).await.unwrap().unwrap();
        assert_eq!(found.id.0, "1");
    }

    #[tokio::test]
    async fn matcher_rejects_prefix_candidates() {
        let library = Arc::new(MemoryLibrary::new());
        library
            .create_record(NewRecord {
                fields: RecordFields {
                    extra: marker_block("https://wb.example", 123),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        let matcher = RecordMatcher::new(library);
        assert!(matcher.find_local_record(12).await.unwrap().is_none());
    }
}
