//! In-memory engine emulator.

mod query;
mod transport;

pub use transport::{InMemoryTransport, TransportCalls};
