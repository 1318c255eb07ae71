//! Logger trait used by the adapter's operations.

use serde_json::Value;

use crate::errors::SearchAdapterError;

/// Structured context attached to a log entry.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// The error that ended the operation, for `:error` entries.
    pub error: Option<&'a SearchAdapterError>,
    /// Operation-specific fields.
    pub data: Option<Value>,
}

impl<'a> LogContext<'a> {
    /// Context carrying only data fields.
    pub fn data(data: Value) -> Self {
        Self {
            error: None,
            data: Some(data),
        }
    }

    /// Context carrying only an error.
    pub fn error(error: &'a SearchAdapterError) -> Self {
        Self {
            error: Some(error),
            data: None,
        }
    }
}

/// The narrow logging surface the adapter needs.
///
/// Purely observational: implementations must not affect control flow.
pub trait AdapterLogger: Send + Sync {
    /// Record a debug entry such as `batchWrite:start`.
    fn debug(&self, message: &str, context: LogContext<'_>);
}
