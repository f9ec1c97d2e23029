//! # Wallabag Provider
//!
//! Concrete [`EntryService`](bridge_traits::catalog::EntryService)
//! implementation for the wallabag v2 REST API: password-grant
//! authentication, paginated entry listing, single-entry fetch,
//! per-format export downloads and a server-info connectivity probe.

pub mod client;
pub mod error;
pub mod types;

pub use client::{WallabagClient, WallabagConfig};
pub use error::{Result, WallabagError};
