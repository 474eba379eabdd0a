//! Domain error types.

use thiserror::Error;

/// Domain-specific errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A revision token could not be decoded.
    #[error("invalid revision token: {reason}")]
    InvalidRevisionToken { reason: String },

    /// A relation tuple string could not be parsed.
    #[error("invalid tuple format: {value}")]
    InvalidTupleFormat { value: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
