//! `tracing` backed logger

use super::traits::Logger;

/// Target used for every event emitted by [`TracingLogger`]
pub const TRACING_TARGET: &str = "kms_resolver";

/// A logger that forwards to the `tracing` crate
///
/// This is the default logger for resolvers. Hosts that install a
/// `tracing-subscriber` receive the records under the `kms_resolver`
/// target; without a subscriber the events are discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: TRACING_TARGET, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: TRACING_TARGET, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: TRACING_TARGET, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: TRACING_TARGET, "{}", message);
    }
}
