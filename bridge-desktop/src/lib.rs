//! # Desktop Bridge Implementations
//!
//! Concrete desktop adapters for the bridge traits:
//!
//! - [`ReqwestHttpClient`] - HTTP transport backed by reqwest
//! - [`SqliteSettingsStore`] - key-value preferences backed by SQLite

pub mod http;
pub mod settings;

pub use http::ReqwestHttpClient;
pub use settings::SqliteSettingsStore;
