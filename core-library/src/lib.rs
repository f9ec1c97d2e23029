//! Local reference-manager library layer.
//!
//! Defines the record model, the [`LibraryClient`] contract the sync
//! engine writes through, and the marker grammar that ties a local
//! record to its remote entry. An in-memory implementation backs tests
//! and local development.

pub mod client;
pub mod error;
pub mod matcher;
pub mod memory;
pub mod record;

pub use client::LibraryClient;
pub use error::{LibraryError, Result};
pub use matcher::RecordMatcher;
pub use memory::MemoryLibrary;
pub use record::{CollectionId, Creator, LocalRecord, NewRecord, RecordFields, RecordId};
