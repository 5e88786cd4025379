use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnipError {
    #[error("A snippet already exists for message {0}")]
    DuplicateRecord(String),

    #[error("Snippet not found: {0}")]
    NotFound(String),

    #[error("Snippet content contains a record marker and cannot be embedded")]
    UnsafeContent,

    #[error("Snippet {0} is already enabled")]
    AlreadyEnabled(String),

    #[error("Snippet {0} is already disabled")]
    AlreadyDisabled(String),

    #[error("Failed to persist the stylesheet buffer: {0}")]
    Persistence(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Stylesheet compiler failed: {0}")]
    Compile(String),

    #[error("Stylesheet compiler timed out after {0:?}")]
    CompileTimeout(std::time::Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SnipError>;
