//! # Search Adapter
//!
//! A typed client facade over a document-search engine. It covers index
//! lifecycle, mappings, single-document CRUD, bulk writes, multi-get and
//! search, with a concrete transport for OpenSearch and an in-memory one for
//! tests.
//!
//! Bulk writes go through [`BulkCompiler`], which turns heterogeneous
//! operations into the engine's positional action/body wire format and
//! synthesizes missing ids, and [`BatchDispatcher`], which submits the result
//! in one round trip.

pub mod adapter;
pub mod bulk;
pub mod config;
pub mod errors;
pub mod ids;
pub mod interfaces;
pub mod logging;
pub mod memory;
pub mod multi_get;
pub mod opensearch;
pub mod responses;
pub mod types;
pub mod utils;

pub use adapter::{AdapterContext, SearchAdapter};
pub use bulk::{expected_line_count, BatchDispatcher, BulkAction, BulkCompiler, BulkLine};
pub use config::{OpenSearchConfig, SearchAdapterConfig};
pub use errors::SearchAdapterError;
pub use ids::{SequentialIdGenerator, UuidGenerator};
pub use interfaces::{AdapterLogger, IdGenerator, LogContext, SearchTransport};
pub use logging::TracingLogger;
pub use memory::{InMemoryTransport, TransportCalls};
pub use multi_get::MultiGetDispatcher;
pub use opensearch::OpenSearchTransport;
pub use responses::{
    AcknowledgedResponse, BulkItemResult, BulkItemStatus, BulkResponse, GetResponse,
    MultiGetDoc, MultiGetResponse, SearchHit, SearchHits, SearchResponse, TotalHits,
    WriteResponse,
};
pub use types::{
    BatchActionKind, BatchGetRequest, BatchOperation, BatchWriteRequest, CreateIndexRequest,
    DeleteDocumentRequest, GetDocumentRequest, IndexDocumentRequest, RefreshPolicy,
    ReplaceDocumentRequest, SearchRequest, UpdateMappingRequest,
};
