mod error;

pub use error::{DomainError, StoreError, ValidationError};

/// Result type for table store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for extension-layer operations
pub type DomainResult<T> = Result<T, DomainError>;
