use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostwiseError {
    /// Bad user input: empty name, empty slug, duplicate id, empty rename.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation referenced an id that is not in the tree.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to delete a reserved module.
    #[error("Protected module: {0}")]
    Protected(String),

    /// Remote store unreachable or a write was rejected. Never rolls back
    /// in-memory state; callers log and carry on.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CostwiseError>;
