use core_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Dimension mismatch for record '{id}': expected {expected}, got {got}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Service error (code {code}): {message}")]
    Service { code: i64, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CollectionResult<T> = Result<T, CollectionError>;

impl CollectionError {
    /// Re-label a service-side rejection for the operation that caused it.
    ///
    /// Transport failures stay `Connection` errors regardless of operation.
    pub(crate) fn into_schema(self) -> Self {
        match self {
            CollectionError::Service { code, message } => {
                CollectionError::Schema(format!("{} (code {})", message, code))
            }
            other => other,
        }
    }

    pub(crate) fn into_query(self) -> Self {
        match self {
            CollectionError::Service { code, message } => {
                CollectionError::Query(format!("{} (code {})", message, code))
            }
            other => other,
        }
    }
}

impl From<reqwest::Error> for CollectionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CollectionError::Internal(format!("Malformed response: {}", err))
        } else {
            CollectionError::Connection(err.to_string())
        }
    }
}

impl From<qdrant_client::QdrantError> for CollectionError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        match err {
            qdrant_client::QdrantError::ResponseError { status } => CollectionError::Service {
                code: status.code() as i64,
                message: status.message().to_string(),
            },
            other => CollectionError::Connection(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CollectionError {
    fn from(err: serde_json::Error) -> Self {
        CollectionError::Internal(format!("JSON error: {}", err))
    }
}

impl From<ConfigError> for CollectionError {
    fn from(err: ConfigError) -> Self {
        CollectionError::Config(err.to_string())
    }
}
