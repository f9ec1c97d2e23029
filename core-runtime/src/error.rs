use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
