/// Errors from temporal operations. Each one means the operation was not applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    #[error("the timeline must be paused first")]
    NotPaused,
    #[error("cannot capture while paused")]
    Paused,
    #[error("snapshot index {index} is out of range (record has {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("resume token is stale or unknown")]
    StaleToken,
    #[error("snapshot encoding failed: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for TimelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
