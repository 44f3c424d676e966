use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Stored schema '{id}' is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Refusing to replace schema '{id}' v{stored} with older v{incoming}")]
    VersionRegression {
        id: String,
        stored: u32,
        incoming: u32,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
