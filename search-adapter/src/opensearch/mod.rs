//! OpenSearch implementation of the search transport.

mod transport;

pub use transport::OpenSearchTransport;
