use std::fmt;
use serde::Serialize;
use thiserror::Error;

/// Errors reported by the table store itself
#[derive(Debug, Error, Clone, Serialize)]
pub enum StoreError {
    #[error("Entity not found: PartitionKey '{partition_key}', RowKey '{row_key}'")]
    NotFound {
        partition_key: String,
        row_key: String,
    },

    #[error("Entity already exists: PartitionKey '{partition_key}', RowKey '{row_key}'")]
    EntityExists {
        partition_key: String,
        row_key: String,
    },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Invalid key '{key}': {reason}")]
    KeyFormatViolation {
        key: String,
        reason: String,
    },

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Transaction failed at action {index}: {reason}")]
    Transaction {
        index: usize,
        reason: String,
    },

    #[error("Store error: {0}")]
    Other(String),
}

/// Domain-level errors surfaced by the extension layer
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed CSV row {row}, column '{column}': {reason}")]
    MalformedRow {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Unknown type tag '{tag}' in CSV row {row}, column '{column}'")]
    UnknownTypeTag {
        row: usize,
        column: String,
        tag: String,
    },

    #[error("Batch for partition '{partition_key}' failed at chunk {chunk_index} after {submitted_chunks} chunk(s) were applied: {source}")]
    BatchFailed {
        partition_key: String,
        chunk_index: usize,
        submitted_chunks: usize,
        /// Whether the failed chunk can be resubmitted as-is
        retry_safe: bool,
        source: StoreError,
    },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<csv::Error> for DomainError {
    fn from(error: csv::Error) -> Self {
        DomainError::Csv(error.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(error: std::io::Error) -> Self {
        DomainError::Io(error.to_string())
    }
}

impl DomainError {
    /// Row and column of a CSV error, if this error came from a specific cell
    pub fn location(&self) -> Option<(usize, &str)> {
        match self {
            DomainError::MalformedRow { row, column, .. }
            | DomainError::UnknownTypeTag { row, column, .. } => Some((*row, column.as_str())),
            _ => None,
        }
    }
}

/// Validation errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required {
        field: String,
    },

    #[error("Field '{field}' must be at least {min} characters")]
    MinLength {
        field: String,
        min: usize,
    },

    #[error("Field '{field}' cannot exceed {max} characters")]
    MaxLength {
        field: String,
        max: usize,
    },

    #[error("Field '{field}' must be between {min} and {max}")]
    Range {
        field: String,
        min: String,
        max: String,
    },

    #[error("Field '{field}' contains invalid format: {reason}")]
    Format {
        field: String,
        reason: String,
    },

    #[error("Field '{field}' contains an invalid value: {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self::Required {
            field: field.to_string(),
        }
    }

    pub fn min_length(field: &str, min: usize) -> Self {
        Self::MinLength {
            field: field.to_string(),
            min,
        }
    }

    pub fn max_length(field: &str, max: usize) -> Self {
        Self::MaxLength {
            field: field.to_string(),
            max,
        }
    }

    pub fn range<T: fmt::Display>(field: &str, min: T, max: T) -> Self {
        Self::Range {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn format(field: &str, reason: &str) -> Self {
        Self::Format {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
