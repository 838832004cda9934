//! Error types for the read pipeline.

use nexus_catalog::CatalogError;
use thiserror::Error;

/// Errors that can occur while reading data.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A path or catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The requested time range is empty or not aligned to the sample period.
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// A buffer does not match the size implied by its element count.
    #[error("buffer size mismatch: {0}")]
    BufferSize(String),

    /// No data source is registered for a catalog.
    #[error("no data source registered for catalog '{0}'")]
    NoDataSource(String),

    /// A data source failed to deliver an item.
    #[error("data source failed to read '{path}': {source}")]
    BackendRead {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// The operation observed a cancellation request.
    #[error("the operation was cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A read task panicked or was aborted.
    #[error("read task failed: {0}")]
    TaskFailed(String),
}

impl PipelineError {
    /// Create an InvalidTimeRange error.
    pub fn invalid_time_range(msg: impl Into<String>) -> Self {
        Self::InvalidTimeRange(msg.into())
    }

    /// Create a BufferSize error.
    pub fn buffer_size(msg: impl Into<String>) -> Self {
        Self::BufferSize(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a data source error for `path`.
    ///
    /// A data source that gives up because it saw the cancellation signal
    /// returns `PipelineError::Cancelled`; that is kept as is.
    pub fn backend_read(path: impl Into<String>, source: anyhow::Error) -> Self {
        match source.downcast::<PipelineError>() {
            Ok(PipelineError::Cancelled) => PipelineError::Cancelled,
            Ok(other) => Self::BackendRead {
                path: path.into(),
                source: other.into(),
            },
            Err(source) => Self::BackendRead {
                path: path.into(),
                source,
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
