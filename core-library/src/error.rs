use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Record {id} not found")]
    RecordNotFound { id: String },

    #[error("Collection {name} not found")]
    CollectionNotFound { name: String },

    #[error("Attachment operation failed: {0}")]
    Attachment(String),

    #[error("Library storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
