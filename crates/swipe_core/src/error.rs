use shared::domain::ItemId;
use thiserror::Error;

/// Failure reported by a backend collaborator. Every transport, status and
/// decoding problem collapses into one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Network(String),
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("malformed backend payload: {0}")]
    Malformed(String),
    #[error("credential rejected by backend")]
    Unauthorized,
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("advance called with no current item")]
    Exhausted,
    #[error("result for item {actual} does not belong to current item {expected}")]
    ItemMismatch { expected: ItemId, actual: ItemId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("failed to fetch classification batch: {0}")]
    FetchFailed(String),
    #[error("submission for item {item_id} failed after {attempts} attempt(s): {reason}")]
    SubmissionFailed {
        item_id: ItemId,
        attempts: u32,
        reason: String,
    },
    #[error("credential rejected; re-authentication required")]
    Unauthorized,
    #[error("no current item to advance past")]
    QueueExhausted,
    #[error("item {item_id} is no longer the current item")]
    StaleItem { item_id: ItemId },
    #[error("a commit is still in progress")]
    Busy,
}

impl From<QueueError> for CoreError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Exhausted => Self::QueueExhausted,
            QueueError::ItemMismatch { actual, .. } => Self::StaleItem { item_id: actual },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
