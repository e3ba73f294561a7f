//! Key/value interface implemented by every backend.

use crate::constraint::{Constraint, Violation};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::seq::{PageSource, Seq};
use crate::thing::{Key, Thing};
use crate::transport::TransportError;

/// Typed CRUD and pattern-matched queries over a remote collection
///
/// Every method blocks the caller until the store answers or `ctx` is done.
/// Conditional writes take a list of constraints combined with `AND`; a
/// rejected condition is reported as [`Error::PreConditionFailed`].
pub trait KeyVal<T: Thing> {
    /// Page source backing [`KeyVal::query`]
    type Source<'a>: PageSource<Item = T>
    where
        Self: 'a;

    /// Fetch the entity with the key of `key`
    fn get(&self, ctx: &Context, key: &T) -> Result<T>;

    /// Write the entity, replacing any previous version
    fn put(&self, ctx: &Context, entity: &T, constraints: &[Constraint<T>]) -> Result<()>;

    /// Delete the entity with the key of `key`
    fn remove(&self, ctx: &Context, key: &T, constraints: &[Constraint<T>]) -> Result<()>;

    /// Apply the set attributes of `entity` as a partial patch and return the new version
    fn update(&self, ctx: &Context, entity: &T, constraints: &[Constraint<T>]) -> Result<T>;

    /// Lazily enumerate entities matching the key pattern of `key`
    ///
    /// The hash key selects the partition; a non-empty sort key narrows the
    /// match to sort keys with that prefix (`_` matches any).
    fn query<'a>(&'a self, ctx: &Context, key: &T) -> Seq<Self::Source<'a>>;
}

/// Sort key that matches every entity of a partition
pub const WILDCARD: &str = "_";

/// Map a failed write to the caller-facing error
pub(crate) fn write_failure(
    ctx: &Context,
    op: &'static str,
    err: TransportError,
    key: Key,
    condition: Option<&str>,
) -> Error {
    if !err.is_condition_failed() {
        return ctx.classify(Error::service_io(err));
    }

    let violation = condition.map(Violation::classify).unwrap_or_default();
    log::debug!(
        "{} of {} rejected by condition {:?} ({:?})",
        op,
        key,
        condition,
        violation
    );

    #[cfg(feature = "metrics")]
    crate::metrics::METRICS.record_precondition_failure(op);

    Error::PreConditionFailed {
        key,
        exists: violation.exists,
        not_exists: violation.not_exists,
        cause: std::sync::Arc::new(err),
    }
}
