//! Local library record model
//!
//! The target of reconciliation: once created, a record is exclusively
//! owned by the local library and mutated in place on later passes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque record identifier assigned by the local library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque collection identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub String);

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One creator slot on a record.
///
/// Remote author strings are not split into name parts; the whole name
/// lands in the family-name slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub family_name: String,
    #[serde(default)]
    pub given_name: String,
}

impl Creator {
    pub fn from_full_name(name: impl Into<String>) -> Self {
        Self {
            family_name: name.into(),
            given_name: String::new(),
        }
    }
}

/// Field set shared between new and existing records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub title: String,
    pub url: String,
    /// Calendar date string (`YYYY-MM-DD`), derived from the remote
    /// creation timestamp.
    pub date: String,
    /// Record creation instant, Unix seconds.
    pub date_added: Option<i64>,
    /// Origin domain of the saved page.
    pub website: Option<String>,
    /// Display/sort key; seeded from the external id's string form.
    pub sort_key: String,
    /// Free-text metadata field carrying the external-id marker block.
    pub extra: String,
    pub creators: Vec<Creator>,
    pub tags: Vec<String>,
}

/// A record not yet persisted to the library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRecord {
    pub fields: RecordFields,
}

/// A persisted library record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRecord {
    pub id: RecordId,
    pub fields: RecordFields,
}

impl LocalRecord {
    pub fn title(&self) -> &str {
        &self.fields.title
    }

    pub fn extra(&self) -> &str {
        &self.fields.extra
    }
}
