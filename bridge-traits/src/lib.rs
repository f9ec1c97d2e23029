//! # Collaborator Bridge Traits
//!
//! Abstraction traits sitting between the sync engine and the outside
//! world. The engine is a pure library: every collaborator is passed in
//! explicitly (constructor injection), never looked up from globals.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP transport with TLS
//! - [`SettingsStore`](settings::SettingsStore) - Key-value preference persistence
//! - [`EntryService`](catalog::EntryService) - Remote read-it-later catalog
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Concrete
//! implementations convert their native errors into it and keep the
//! original context (HTTP status, body, file path) in the message.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` so implementations can be shared
//! across async tasks behind `Arc`.

pub mod catalog;
pub mod error;
pub mod http;
pub mod settings;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{EntriesPage, EntryService, ExportFormat, PageProgress, RemoteEntry, ServerInfo};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use settings::SettingsStore;
pub use time::{Clock, SystemClock};
