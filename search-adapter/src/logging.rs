//! `AdapterLogger` backed by `tracing`.

use tracing::debug;

use crate::interfaces::{AdapterLogger, LogContext};

/// Forwards adapter log entries to `tracing` at debug level.
///
/// The entry's message becomes the event message; `error` and `data` become
/// structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl AdapterLogger for TracingLogger {
    fn debug(&self, message: &str, context: LogContext<'_>) {
        match (context.error, context.data) {
            (Some(error), Some(data)) => debug!(error = %error, data = %data, "{}", message),
            (Some(error), None) => debug!(error = %error, "{}", message),
            (None, Some(data)) => debug!(data = %data, "{}", message),
            (None, None) => debug!("{}", message),
        }
    }
}
