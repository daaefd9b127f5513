/// Error taxonomy for the query layer.
///
/// `InvalidInput` and `NotFound` are expected outcomes that go back to the
/// caller verbatim. Storage failures during a read become `Internal` with a
/// generic message; the detail only goes to the log.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Stable machine-readable name, used in tool error payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(e: rusqlite::Error) -> Self {
        tracing::error!("storage engine failure: {e}");
        Self::Internal("internal storage error".to_string())
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
