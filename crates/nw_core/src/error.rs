use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Backend contract violation: {0}")]
    BackendContract(String),
}

pub type Result<T> = std::result::Result<T, Error>;
