use thiserror::Error;

/// Failure taxonomy shared by both pipeline stages.
#[derive(Error, Debug)]
pub enum RoundUpError {
    /// Signature missing or mismatched. Always fails closed.
    #[error("webhook signature rejected")]
    Authentication,
    #[error("malformed webhook payload: {0}")]
    Decode(String),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("savings goal transfer failed (status {status:?}): {detail}")]
    DownstreamTransfer { status: Option<u16>, detail: String },
    #[error("configuration error: {0}")]
    Config(String),
}

impl RoundUpError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(Box::new(std::io::Error::other(message.into())))
    }
}

impl From<serde_json::Error> for RoundUpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for RoundUpError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, RoundUpError>;
