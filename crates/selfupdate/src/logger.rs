//! Optional diagnostic sinks.
//!
//! Sources report what they are doing through a [`Logger`] injected at
//! construction time. Every method defaults to a no-op, so an implementation
//! only overrides the levels it cares about. Nothing in this crate depends on
//! a logger's side effects.

use std::fmt;
use std::sync::Arc;

/// Error, info and debug hooks.
pub trait Logger: Send + Sync {
    /// Something prevented an update from being obtained.
    fn error(&self, _args: fmt::Arguments<'_>) {}

    /// A noteworthy, non-fatal event.
    fn info(&self, _args: fmt::Arguments<'_>) {}

    /// Fine-grained progress and fallbacks.
    fn debug(&self, _args: fmt::Arguments<'_>) {}
}

/// Logger that discards everything. This is the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {}

/// Logger forwarding to the `tracing` macros under the `selfupdate` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: "selfupdate", "{}", args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "selfupdate", "{}", args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "selfupdate", "{}", args);
    }
}

/// Shared handle to the default no-op logger.
pub fn noop() -> Arc<dyn Logger> {
    Arc::new(NoopLogger)
}
