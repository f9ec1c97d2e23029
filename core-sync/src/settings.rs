//! Persisted configuration surface of the engine.
//!
//! Everything lives in the key-value [`SettingsStore`]; a
//! [`SyncSettings`] snapshot is loaded once at the start of each pass,
//! so configuration changes apply from the next pass.

use std::collections::BTreeSet;
use std::time::Duration;

use bridge_traits::catalog::ExportFormat;
use bridge_traits::settings::SettingsStore;
use tracing::debug;

use crate::error::Result;

/// Intervals below this disable the timer rather than schedule a
/// near-busy loop.
pub const MIN_SYNC_INTERVAL_MINUTES: i64 = 15;

const DEFAULT_SYNC_INTERVAL_MINUTES: i64 = 60;

/// Settings keys. String-typed unless noted.
pub mod keys {
    pub const SERVER_URL: &str = "wallabag.server_url";
    pub const CLIENT_ID: &str = "wallabag.client_id";
    pub const CLIENT_SECRET: &str = "wallabag.client_secret";
    pub const USERNAME: &str = "wallabag.username";
    pub const PASSWORD: &str = "wallabag.password";
    /// Bool.
    pub const SYNC_ENABLED: &str = "sync.enabled";
    /// Integer, minutes.
    pub const SYNC_INTERVAL_MINUTES: &str = "sync.interval_minutes";
    /// Integer, Unix seconds. 0 or absent means full sync.
    pub const LAST_SYNC: &str = "sync.last_sync";
    /// Bool; pre-dates the per-format toggles.
    pub const DOWNLOAD_PDF_LEGACY: &str = "sync.download_pdf";

    /// Per-format toggle key (bool), e.g. `sync.download.epub`.
    pub fn download_format(format: super::ExportFormat) -> String {
        format!("sync.download.{}", format.as_str())
    }
}

/// Which export formats a pass downloads.
///
/// Installations configured before the per-format toggles existed only
/// carry the single pdf boolean; any present per-format key switches
/// the whole policy over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPolicy {
    LegacySingleFormat(bool),
    PerFormatSet(BTreeSet<ExportFormat>),
}

impl DownloadPolicy {
    /// Concrete format list for a pass.
    pub fn formats(&self) -> Vec<ExportFormat> {
        match self {
            DownloadPolicy::LegacySingleFormat(true) => vec![ExportFormat::Pdf],
            DownloadPolicy::LegacySingleFormat(false) => Vec::new(),
            DownloadPolicy::PerFormatSet(set) => set.iter().copied().collect(),
        }
    }
}

/// Snapshot of the configuration at pass start.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub server_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub sync_enabled: bool,
    pub interval_minutes: i64,
    pub download_policy: DownloadPolicy,
}

impl SyncSettings {
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        let get = |key: &'static str| async move {
            Ok::<_, crate::error::SyncError>(store.get_string(key).await?.unwrap_or_default())
        };

        let mut per_format = BTreeSet::new();
        let mut any_per_format_key = false;
        for format in ExportFormat::ALL {
            let key = keys::download_format(format);
            if store.has_key(&key).await? {
                any_per_format_key = true;
                if store.get_bool(&key).await?.unwrap_or(false) {
                    per_format.insert(format);
                }
            }
        }
        let download_policy = if any_per_format_key {
            DownloadPolicy::PerFormatSet(per_format)
        } else {
            let legacy = store
                .get_bool(keys::DOWNLOAD_PDF_LEGACY)
                .await?
                .unwrap_or(false);
            DownloadPolicy::LegacySingleFormat(legacy)
        };

        let settings = Self {
            server_url: get(keys::SERVER_URL).await?,
            client_id: get(keys::CLIENT_ID).await?,
            client_secret: get(keys::CLIENT_SECRET).await?,
            username: get(keys::USERNAME).await?,
            password: get(keys::PASSWORD).await?,
            sync_enabled: store
                .get_bool(keys::SYNC_ENABLED)
                .await?
                .unwrap_or(true),
            interval_minutes: store
                .get_i64(keys::SYNC_INTERVAL_MINUTES)
                .await?
                .unwrap_or(DEFAULT_SYNC_INTERVAL_MINUTES),
            download_policy,
        };
        debug!(
            enabled = settings.sync_enabled,
            interval_minutes = settings.interval_minutes,
            "Loaded sync settings"
        );
        Ok(settings)
    }

    /// All credential fields present.
    pub fn is_configured(&self) -> bool {
        !self.server_url.is_empty()
            && !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.username.is_empty()
            && !self.password.is_empty()
    }

    /// Timer period, or `None` when the configured interval is below
    /// the floor and the timer must stay disabled.
    pub fn timer_interval(&self) -> Option<Duration> {
        if self.interval_minutes < MIN_SYNC_INTERVAL_MINUTES {
            return None;
        }
        Some(Duration::from_secs(self.interval_minutes as u64 * 60))
    }
}

/// Read the sync watermark. 0 means no prior completed pass.
pub async fn load_watermark(store: &dyn SettingsStore) -> Result<i64> {
    Ok(store.get_i64(keys::LAST_SYNC).await?.unwrap_or(0))
}

/// Persist the watermark after a completed pass.
pub async fn store_watermark(store: &dyn SettingsStore, timestamp: i64) -> Result<()> {
    store.set_i64(keys::LAST_SYNC, timestamp).await?;
    Ok(())
}
