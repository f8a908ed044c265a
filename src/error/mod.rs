//! Error handling for the partitioning and training pipeline.

use std::{fmt, io};

use arrow::error::ArrowError;

use crate::encode::EncodeError;

/// Specialized error type for the pipeline
#[derive(Debug)]
pub enum PipelineError {
    /// Error opening, reading or writing a file
    IoError(io::Error),
    /// Error processing CSV / Arrow data
    ArrowError(ArrowError),
    /// Error with the expected dataset schema (e.g. a declared column is absent)
    SchemaError(String),
    /// Error with the data itself (e.g. an empty or single-class partition)
    DataError(String),
    /// Error serializing or deserializing a weight artifact
    JsonError(serde_json::Error),
}

impl PipelineError {
    /// Create a schema error with the given message
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaError(message.into())
    }

    /// Create a data error with the given message
    pub fn data(message: impl Into<String>) -> Self {
        Self::DataError(message.into())
    }

    /// Whether this error is a missing-file condition.
    ///
    /// Missing files are handled by skipping the affected unit and
    /// continuing the batch, unlike schema or data errors which abort
    /// only their own unit.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::IoError(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

impl From<io::Error> for PipelineError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error)
    }
}

impl From<ArrowError> for PipelineError {
    fn from(error: ArrowError) -> Self {
        Self::ArrowError(error)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        Self::JsonError(error)
    }
}

impl From<EncodeError> for PipelineError {
    fn from(error: EncodeError) -> Self {
        match error {
            EncodeError::Arrow(e) => Self::ArrowError(e),
            EncodeError::MissingColumn { .. }
            | EncodeError::NonNumeric { .. }
            | EncodeError::NoTarget => Self::SchemaError(error.to_string()),
            EncodeError::ClassCount { .. }
            | EncodeError::EmptyPartition
            | EncodeError::Shape(_) => Self::DataError(error.to_string()),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::ArrowError(e) => write!(f, "Arrow error: {e}"),
            Self::SchemaError(msg) => write!(f, "Schema error: {msg}"),
            Self::DataError(msg) => write!(f, "Data error: {msg}"),
            Self::JsonError(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
