//! Search adapter error types.
//!
//! Caller contract violations are kept apart from everything the transport or
//! the engine reports, so callers can tell "my request was malformed" from
//! "the engine said no".

use thiserror::Error;

/// Unified errors from search adapter operations.
///
/// `ValidationError` is raised before any transport call is made. Every other
/// variant originates in the transport or the engine and is handed back to the
/// caller untouched: the adapter never retries and never substitutes defaults.
#[derive(Debug, Clone, Error)]
pub enum SearchAdapterError {
    /// Caller contract violation (empty index, missing id, unknown action, ...).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to build or reach the search engine connection.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The HTTP request could not be completed.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The engine answered with a non-success status.
    #[error("Engine error (status {status}): {body}")]
    EngineError { status: u16, body: String },

    /// Document not found.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Failed to parse a response from the engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a request body.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A bulk submission failed as a whole.
    #[error("Bulk request of {operation_count} operations failed: {source}")]
    BulkDispatchError {
        operation_count: usize,
        #[source]
        source: Box<SearchAdapterError>,
    },
}

impl SearchAdapterError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }

    /// Create an engine error from a response status and body.
    pub fn engine(status: u16, body: impl Into<String>) -> Self {
        Self::EngineError {
            status,
            body: body.into(),
        }
    }

    /// Create a document not found error.
    pub fn document_not_found(index: &str, id: &str) -> Self {
        Self::DocumentNotFound(format!("index={}, id={}", index, id))
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Tag a failed bulk submission with the number of operations it carried.
    pub fn bulk_dispatch(operation_count: usize, source: SearchAdapterError) -> Self {
        Self::BulkDispatchError {
            operation_count,
            source: Box::new(source),
        }
    }

    /// Whether this error is a caller contract violation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }

    /// Whether this error reports an absent document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DocumentNotFound(_))
    }
}
