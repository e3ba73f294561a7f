//! Transport boundary shared by the store backends.
//!
//! Backends talk to the remote store through small traits
//! ([`DynamoDb`](crate::ddb::DynamoDb), [`ObjectStore`](crate::s3::ObjectStore))
//! that report failures as [`TransportError`]. The only failure the crate
//! interprets is a rejected condition; everything else surfaces as
//! [`Error::ServiceIO`](crate::Error::ServiceIO).

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The store rejected a conditional request
    ConditionFailed,
    /// Any other failure
    Other,
}

/// Failure reported by a transport
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn condition_failed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConditionFailed, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn is_condition_failed(&self) -> bool {
        self.kind == TransportErrorKind::ConditionFailed
    }
}

/// Run one store request inside a span, recording its latency
pub(crate) fn instrument<R>(op: &'static str, table: &str, f: impl FnOnce() -> R) -> R {
    #[cfg(feature = "tracing")]
    let _span = crate::metrics::tracing_helpers::request_span(op, table).entered();

    let start = Instant::now();
    let out = f();
    log::trace!("{} on {} took {:?}", op, table, start.elapsed());

    #[cfg(feature = "metrics")]
    crate::metrics::METRICS.record_request(op, start.elapsed());

    out
}
