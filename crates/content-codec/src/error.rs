use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid array payload: {0}")]
    InvalidArray(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
