//! Error types for the wallabag provider

use thiserror::Error;

/// Wallabag provider errors
#[derive(Error, Debug)]
pub enum WallabagError {
    /// Credentials rejected or token endpoint unreachable
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned a non-success status.
    ///
    /// Carries the HTTP status and response body for diagnostics.
    #[error("Wallabag API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse an API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Network-level failure (connect, TLS, timeout)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for wallabag operations
pub type Result<T> = std::result::Result<T, WallabagError>;

impl From<WallabagError> for bridge_traits::error::BridgeError {
    fn from(error: WallabagError) -> Self {
        match error {
            WallabagError::AuthenticationFailed(msg) => {
                bridge_traits::error::BridgeError::AuthenticationFailed(msg)
            }
            WallabagError::ApiError {
                status_code,
                message,
            } => bridge_traits::error::BridgeError::Transport {
                status: status_code,
                body: message,
            },
            WallabagError::ParseError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Parse error: {}",
                    msg
                ))
            }
            WallabagError::NetworkError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Network error: {}",
                    msg
                ))
            }
            WallabagError::BridgeError(e) => e,
        }
    }
}
