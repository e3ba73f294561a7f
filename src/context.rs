//! Cancellation and deadline context for blocking calls.
//!
//! Every call that may block on the remote store takes a `&Context`. Transports
//! are expected to poll [`Context::check`] (or [`Context::remaining`]) while
//! waiting, and the crate itself checks it before each request and when a
//! request fails, so a cancelled caller sees [`Error::Cancelled`] or
//! [`Error::Timeout`] instead of a transport error.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Caller-supplied cancellation scope
///
/// Cloning a context shares its cancellation flag; [`Context::with_timeout`]
/// derives a child that shares the flag but carries a tighter deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// Context that never expires
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(match self.deadline {
                Some(parent) if parent < deadline => parent,
                _ => deadline,
            }),
        }
    }

    /// Context using the configured request timeout
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::background().with_timeout(Duration::from_secs(config.timeout_seconds))
    }

    /// Cancel this context and every clone of it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail with `Cancelled`/`Timeout` if the context is done
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::Timeout),
            _ => Ok(()),
        }
    }

    /// Classify a failed request: a done context wins over the transport error
    pub(crate) fn classify(&self, err: Error) -> Error {
        match self.check() {
            Err(done) => done,
            Ok(()) => err,
        }
    }
}
