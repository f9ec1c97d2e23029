use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

/// Engine-level error taxonomy.
///
/// Authentication and settings failures are fatal to the current pass.
/// Transport failures are fatal to the operation that raised them; the
/// scheduler decides whether that aborts the pass or only one entry.
/// Nothing is retried at any layer.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transport error (status {status}): {body}")]
    Transport { status: u16, body: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Sync operation failed: {0}")]
    Operation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A sync is already in progress")]
    SyncInProgress,
}

impl From<BridgeError> for SyncError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::AuthenticationFailed(message) => SyncError::Auth(message),
            BridgeError::Transport { status, body } => SyncError::Transport { status, body },
            BridgeError::SettingsError(message) => SyncError::Settings(message),
            other => SyncError::Operation(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
