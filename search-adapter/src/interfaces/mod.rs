//! Interface definitions for the adapter's collaborators.
//!
//! These traits allow for dependency injection: the engine transport, the
//! optional logger and the identifier source can all be swapped, which is how
//! the in-memory transport and deterministic ids are used in tests.

mod adapter_logger;
mod id_generator;
mod search_transport;

pub use adapter_logger::{AdapterLogger, LogContext};
pub use id_generator::IdGenerator;
pub use search_transport::SearchTransport;
