//! Error types for lodestone

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Index corruption: {0}")]
    Corruption(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Construction failed for {shard}: {reason}")]
    Construction { shard: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Query execution cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
