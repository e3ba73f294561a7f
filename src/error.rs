//! Error types for key/value I/O.
//!
//! All fallible operations in the crate return [`Error`]. Transport and callback
//! failures are kept as shared trait objects so the error stays `Clone`: a lazy
//! sequence records its terminal error once and reports it from both
//! [`Seq::fmap`](crate::Seq::fmap) and [`Seq::error`](crate::Seq::error).

use crate::thing::Key;
use std::sync::Arc;

/// Shared, type-erased cause
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Crate result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Key/value error
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Key encoding failed
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Entity encoding or decoding failed
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// Transport-level failure
    #[error("service i/o failed: {0}")]
    ServiceIO(Cause),

    /// A point lookup found no record
    #[error("not found: {key}")]
    NotFound { key: Key },

    /// A conditional write/delete/update was rejected by the store
    ///
    /// `exists` is set when the guard is consistent with an existence violation
    /// (the record was expected to be absent or equal), `not_exists` when it is
    /// consistent with a non-existence violation (the record was expected to be
    /// present or different).
    #[error("pre-condition failed: {key} (exists: {exists}, not exists: {not_exists})")]
    PreConditionFailed {
        key: Key,
        exists: bool,
        not_exists: bool,
        #[source]
        cause: Cause,
    },

    /// Sequence exhausted; consumed by the sequence itself
    #[error("end of stream")]
    EndOfStream,

    /// A [`Seq::fmap`](crate::Seq::fmap) callback failed on an element
    ///
    /// `Error` is not generic over the entity type, so the element is
    /// identified by its key (the sequence position it was read at) rather
    /// than carried itself. Resume past it with `continue_from(&key)`.
    #[error("failed to process entity {key}: {cause}")]
    ProcessEntity {
        key: Key,
        #[source]
        cause: Cause,
    },

    /// A constraint references a field without a storage attribute
    #[error("field has no storage mapping (constraint {op} on an unmapped field)")]
    UnmappedField { op: &'static str },

    /// Merged condition tables bind a different operand to a taken value placeholder
    #[error("conflicting operands for placeholder {placeholder}")]
    ConflictingOperand { placeholder: String },

    /// The caller cancelled the context
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed
    #[error("operation timed out")]
    Timeout,

    /// Configuration could not be loaded or parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn service_io<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::ServiceIO(Arc::new(err))
    }

    pub(crate) fn process_entity<E>(key: Key, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::ProcessEntity {
            key,
            cause: Arc::from(err.into()),
        }
    }

    /// `true` for [`Error::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// `true` for [`Error::PreConditionFailed`]
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Error::PreConditionFailed { .. })
    }

    /// `true` for [`Error::Cancelled`] and [`Error::Timeout`]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Timeout)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
