use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("duplicate child key {0:?} in encoded frame")]
    DuplicateChildKey(String),

    #[error("serialization error: {0}")]
    #[cfg(feature = "serde")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed chunk: {0}")]
    MalformedChunk(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
