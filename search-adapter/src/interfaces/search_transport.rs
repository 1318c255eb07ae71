//! Search transport trait definition.
//!
//! This module defines the abstract interface to the document-search engine,
//! allowing for different backend implementations (OpenSearch, in-memory, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::bulk::BulkLine;
use crate::errors::SearchAdapterError;
use crate::responses::{
    AcknowledgedResponse, BulkResponse, GetResponse, MultiGetResponse, SearchResponse,
    WriteResponse,
};
use crate::types::{RefreshPolicy, SearchRequest};

/// Abstracts the request/response transport to the search engine.
///
/// Each method corresponds to exactly one engine round trip. Implementations
/// report failures as `SearchAdapterError` and never retry; connection pooling,
/// timeouts and cancellation are the implementation's own concern.
///
/// Document bodies cross this boundary as `serde_json::Value`; typing happens
/// in `SearchAdapter`.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Create an index with optional settings and mappings.
    async fn create_index(
        &self,
        index: &str,
        body: Option<&Value>,
    ) -> Result<AcknowledgedResponse, SearchAdapterError>;

    /// Fetch an index description (aliases, mappings, settings).
    async fn get_index(&self, index: &str) -> Result<Value, SearchAdapterError>;

    /// Delete an index.
    async fn delete_index(&self, index: &str) -> Result<AcknowledgedResponse, SearchAdapterError>;

    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchAdapterError>;

    /// Fetch the mapping of an index.
    async fn get_mapping(&self, index: &str) -> Result<Value, SearchAdapterError>;

    /// Add fields to the mapping of an index.
    async fn put_mapping(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<AcknowledgedResponse, SearchAdapterError>;

    /// Index a document under `id`, replacing any existing document with that id.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
        refresh: RefreshPolicy,
    ) -> Result<WriteResponse, SearchAdapterError>;

    /// Fetch a document.
    ///
    /// # Returns
    ///
    /// * `Err(SearchAdapterError::DocumentNotFound)` - If no document has this id
    async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<GetResponse<Value>, SearchAdapterError>;

    /// Delete a document.
    ///
    /// # Returns
    ///
    /// * `Err(SearchAdapterError::DocumentNotFound)` - If no document has this id
    async fn delete_document(
        &self,
        index: &str,
        id: &str,
        refresh: RefreshPolicy,
    ) -> Result<WriteResponse, SearchAdapterError>;

    /// Submit a compiled bulk body.
    ///
    /// The engine reads `lines` positionally; the response carries one item per
    /// action line, in order.
    async fn bulk(
        &self,
        lines: &[BulkLine],
        refresh: RefreshPolicy,
    ) -> Result<BulkResponse, SearchAdapterError>;

    /// Fetch several documents of one index by id, in request order.
    async fn mget(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<MultiGetResponse<Value>, SearchAdapterError>;

    /// Execute a search.
    async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResponse<Value>, SearchAdapterError>;
}
