//! The search adapter: one method per engine operation over a shared context.
//!
//! Every operation validates its input, logs `<op>:start`, makes exactly one
//! transport round trip (or delegates to the batch/multi-get dispatchers),
//! logs `<op>:success` or `<op>:error`, and returns the transport's result or
//! error unchanged.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::bulk::BatchDispatcher;
use crate::config::SearchAdapterConfig;
use crate::errors::SearchAdapterError;
use crate::ids::UuidGenerator;
use crate::interfaces::{AdapterLogger, IdGenerator, LogContext, SearchTransport};
use crate::multi_get::MultiGetDispatcher;
use crate::responses::{
    AcknowledgedResponse, BulkResponse, GetResponse, MultiGetResponse, SearchResponse,
    WriteResponse,
};
use crate::types::{
    BatchGetRequest, BatchWriteRequest, CreateIndexRequest, DeleteDocumentRequest,
    GetDocumentRequest, IndexDocumentRequest, ReplaceDocumentRequest, SearchRequest,
    UpdateMappingRequest,
};
use crate::utils;

/// Dependencies shared by every adapter operation.
#[derive(Clone)]
pub struct AdapterContext {
    /// Engine transport.
    pub transport: Arc<dyn SearchTransport>,
    /// Optional observer of `start`/`success`/`error` entries.
    pub logger: Option<Arc<dyn AdapterLogger>>,
    /// Source of ids for writes that omit one.
    pub ids: Arc<dyn IdGenerator>,
    pub config: SearchAdapterConfig,
}

impl AdapterContext {
    /// Create a context with random UUID ids, no logger and the default config.
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self {
            transport,
            logger: None,
            ids: Arc::new(UuidGenerator),
            config: SearchAdapterConfig::default(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn AdapterLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_config(mut self, config: SearchAdapterConfig) -> Self {
        self.config = config;
        self
    }
}

fn to_value<T: Serialize>(body: &T) -> Result<Value, SearchAdapterError> {
    serde_json::to_value(body).map_err(|e| SearchAdapterError::serialization(e.to_string()))
}

/// Typed facade over a search engine.
///
/// Cheap to clone; clones share the same context.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use search_adapter::{AdapterContext, OpenSearchConfig, OpenSearchTransport, SearchAdapter};
///
/// let transport = OpenSearchTransport::from_config(&OpenSearchConfig::from_env())?;
/// let adapter = SearchAdapter::new(AdapterContext::new(Arc::new(transport)));
///
/// let response = adapter
///     .batch_write(&BatchWriteRequest::new(vec![
///         BatchOperation::index("books", json!({"title": "A"})),
///         BatchOperation::delete("books", "D9"),
///     ]))
///     .await?;
/// if response.errors {
///     // inspect response.items
/// }
/// ```
#[derive(Clone)]
pub struct SearchAdapter {
    context: AdapterContext,
}

impl SearchAdapter {
    pub fn new(context: AdapterContext) -> Self {
        Self { context }
    }

    fn transport(&self) -> &dyn SearchTransport {
        self.context.transport.as_ref()
    }

    fn log(&self, message: &str, context: LogContext<'_>) {
        if let Some(logger) = &self.context.logger {
            logger.debug(message, context);
        }
    }

    /// Wrap one call in `start`/`success`/`error` log entries.
    async fn observe<R, Fut>(
        &self,
        operation: &str,
        start: Value,
        call: Fut,
        summary: impl FnOnce(&R) -> Value,
    ) -> Result<R, SearchAdapterError>
    where
        Fut: Future<Output = Result<R, SearchAdapterError>>,
    {
        self.log(&format!("{}:start", operation), LogContext::data(start));

        match call.await {
            Ok(result) => {
                self.log(
                    &format!("{}:success", operation),
                    LogContext::data(summary(&result)),
                );
                Ok(result)
            }
            Err(e) => {
                self.log(&format!("{}:error", operation), LogContext::error(&e));
                Err(e)
            }
        }
    }

    /// Create an index, optionally with settings and mappings.
    pub async fn create_index(
        &self,
        request: &CreateIndexRequest,
    ) -> Result<AcknowledgedResponse, SearchAdapterError> {
        utils::validate_index(&request.index)?;
        let index = request.index.as_str();

        self.observe(
            "createIndex",
            json!({ "index": index }),
            self.transport().create_index(index, request.body.as_ref()),
            |_| json!({ "index": index }),
        )
        .await
    }

    /// Fetch the description (aliases, mappings, settings) of an index.
    pub async fn get_index(&self, index: &str) -> Result<Value, SearchAdapterError> {
        utils::validate_index(index)?;

        self.observe(
            "getIndex",
            json!({ "index": index }),
            self.transport().get_index(index),
            |_| json!({ "index": index }),
        )
        .await
    }

    pub async fn delete_index(&self, index: &str) -> Result<AcknowledgedResponse, SearchAdapterError> {
        utils::validate_index(index)?;

        self.observe(
            "deleteIndex",
            json!({ "index": index }),
            self.transport().delete_index(index),
            |_| json!({ "index": index }),
        )
        .await
    }

    pub async fn exists_index(&self, index: &str) -> Result<bool, SearchAdapterError> {
        utils::validate_index(index)?;

        self.observe(
            "existsIndex",
            json!({ "index": index }),
            self.transport().index_exists(index),
            |exists| json!({ "index": index, "exists": exists }),
        )
        .await
    }

    pub async fn get_mapping(&self, index: &str) -> Result<Value, SearchAdapterError> {
        utils::validate_index(index)?;

        self.observe(
            "getMapping",
            json!({ "index": index }),
            self.transport().get_mapping(index),
            |_| json!({ "index": index }),
        )
        .await
    }

    /// Add fields to an index mapping. Existing fields cannot be changed by the engine.
    pub async fn update_mapping(
        &self,
        request: &UpdateMappingRequest,
    ) -> Result<AcknowledgedResponse, SearchAdapterError> {
        utils::validate_index(&request.index)?;
        let index = request.index.as_str();

        self.observe(
            "updateMapping",
            json!({ "index": index }),
            self.transport().put_mapping(index, &request.body),
            |_| json!({ "index": index }),
        )
        .await
    }

    /// Index a document, replacing any document with the same id.
    ///
    /// A missing or empty id is drawn from the context's [`IdGenerator`]; the
    /// id used is reported in the response.
    ///
    /// # Returns
    ///
    /// * `Ok(WriteResponse)` - `result` is `created` or `updated`
    /// * `Err(SearchAdapterError::ValidationError)` - If the index is empty
    /// * `Err(SearchAdapterError::SerializationError)` - If the body cannot be serialized
    pub async fn index_document<T: Serialize>(
        &self,
        request: &IndexDocumentRequest<T>,
    ) -> Result<WriteResponse, SearchAdapterError> {
        utils::validate_index(&request.index)?;
        let body = to_value(&request.body)?;
        let index = request.index.as_str();
        let id = match request.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.context.ids.generate(),
        };

        self.observe(
            "indexDocument",
            json!({ "index": index, "id": id }),
            self.transport()
                .index_document(index, &id, &body, request.refresh),
            |response| json!({ "index": index, "id": response.id }),
        )
        .await
    }

    /// Fetch one document, decoding its source into `T`.
    ///
    /// # Returns
    ///
    /// * `Ok(GetResponse<T>)` - The stored document
    /// * `Err(SearchAdapterError::DocumentNotFound)` - If no document has this id
    /// * `Err(SearchAdapterError::ParseError)` - If the source does not decode into `T`
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        request: &GetDocumentRequest,
    ) -> Result<GetResponse<T>, SearchAdapterError> {
        utils::validate_index(&request.index)?;
        utils::validate_id("id", &request.id)?;
        let (index, id) = (request.index.as_str(), request.id.as_str());

        self.observe(
            "getDocument",
            json!({ "index": index, "id": id }),
            async { self.transport().get_document(index, id).await?.decode() },
            |_| json!({ "index": index, "id": id }),
        )
        .await
    }

    pub async fn delete_document(
        &self,
        request: &DeleteDocumentRequest,
    ) -> Result<WriteResponse, SearchAdapterError> {
        utils::validate_index(&request.index)?;
        utils::validate_id("id", &request.id)?;
        let (index, id) = (request.index.as_str(), request.id.as_str());

        self.observe(
            "deleteDocument",
            json!({ "index": index, "id": id }),
            self.transport().delete_document(index, id, request.refresh),
            |_| json!({ "index": index, "id": id }),
        )
        .await
    }

    /// Overwrite the document stored under an existing or new id.
    pub async fn replace_document<T: Serialize>(
        &self,
        request: &ReplaceDocumentRequest<T>,
    ) -> Result<WriteResponse, SearchAdapterError> {
        utils::validate_index(&request.index)?;
        utils::validate_id("id", &request.id)?;
        let body = to_value(&request.body)?;
        let (index, id) = (request.index.as_str(), request.id.as_str());

        self.observe(
            "replaceDocument",
            json!({ "index": index, "id": id }),
            self.transport()
                .index_document(index, id, &body, request.refresh),
            |_| json!({ "index": index, "id": id }),
        )
        .await
    }

    /// Apply a batch of writes in one bulk round trip.
    ///
    /// An empty batch returns an empty, error-free envelope without contacting
    /// the engine. A response with `errors == true` is still `Ok`: some items
    /// failed and the caller must inspect `items`.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResponse)` - One item per operation, in order
    /// * `Err(SearchAdapterError::ValidationError)` - Empty index, or `update`/`delete` without an id
    /// * `Err(SearchAdapterError::BulkDispatchError)` - If the submission failed
    pub async fn batch_write<T: Serialize>(
        &self,
        request: &BatchWriteRequest<T>,
    ) -> Result<BulkResponse, SearchAdapterError> {
        let dispatcher = BatchDispatcher::new(
            self.transport(),
            self.context.ids.as_ref(),
            &self.context.config,
        );
        dispatcher.validate(&request.operations)?;

        self.observe(
            "batchWrite",
            json!({ "count": request.operations.len() }),
            dispatcher.dispatch(&request.operations, request.refresh),
            |response| json!({ "took": response.took, "errors": response.errors }),
        )
        .await
    }

    /// Fetch several documents of one index, one entry per requested id.
    pub async fn batch_get<T: DeserializeOwned>(
        &self,
        request: &BatchGetRequest,
    ) -> Result<MultiGetResponse<T>, SearchAdapterError> {
        utils::validate_index(&request.index)?;
        let dispatcher = MultiGetDispatcher::new(self.transport());

        self.observe(
            "batchGet",
            json!({ "index": request.index, "count": request.ids.len() }),
            async { dispatcher.fetch(request).await?.decode() },
            |response| json!({ "found": response.docs.len() }),
        )
        .await
    }

    /// Run a query. `request.body` is passed to the engine unmodified.
    ///
    /// Use [`SearchResponse::total`] to read the hit count regardless of the
    /// form the engine reported it in.
    pub async fn search<T: DeserializeOwned>(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResponse<T>, SearchAdapterError> {
        utils::validate_index(&request.index)?;

        self.observe(
            "search",
            json!({ "index": request.index, "body": request.body.to_string() }),
            async { self.transport().search(request).await?.decode() },
            |response| json!({ "took": response.took, "hits": response.total() }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIdGenerator;
    use crate::memory::InMemoryTransport;
    use crate::types::{BatchOperation, RefreshPolicy};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLogger {
        entries: Mutex<Vec<(String, Option<String>, Option<Value>)>>,
    }

    impl RecordingLogger {
        fn messages(&self) -> Vec<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .map(|(m, _, _)| m.clone())
                .collect()
        }

        fn data(&self, message: &str) -> Option<Value> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .find(|(m, _, _)| m == message)
                .and_then(|(_, _, d)| d.clone())
        }
    }

    impl AdapterLogger for RecordingLogger {
        fn debug(&self, message: &str, context: LogContext<'_>) {
            self.entries.lock().unwrap().push((
                message.to_string(),
                context.error.map(|e| e.to_string()),
                context.data,
            ));
        }
    }

    fn adapter() -> (SearchAdapter, Arc<InMemoryTransport>, Arc<RecordingLogger>) {
        let transport = Arc::new(InMemoryTransport::new());
        let logger = Arc::new(RecordingLogger::default());
        let context = AdapterContext::new(transport.clone())
            .with_logger(logger.clone())
            .with_id_generator(Arc::new(SequentialIdGenerator::new("doc")));
        (SearchAdapter::new(context), transport, logger)
    }

    #[tokio::test]
    async fn test_success_logs_start_then_success() {
        let (adapter, _, logger) = adapter();

        adapter
            .create_index(&CreateIndexRequest::new("books"))
            .await
            .unwrap();
        let exists = adapter.exists_index("books").await.unwrap();

        assert!(exists);
        assert_eq!(
            logger.messages(),
            vec![
                "createIndex:start",
                "createIndex:success",
                "existsIndex:start",
                "existsIndex:success"
            ]
        );
        assert_eq!(
            logger.data("existsIndex:success"),
            Some(json!({"index": "books", "exists": true}))
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_logged_and_returned_unchanged() {
        let (adapter, transport, logger) = adapter();
        transport.fail_next(SearchAdapterError::engine(503, "unavailable"));

        let err = adapter.get_index("books").await.unwrap_err();

        assert!(matches!(err, SearchAdapterError::EngineError { status: 503, .. }));
        assert_eq!(logger.messages(), vec!["getIndex:start", "getIndex:error"]);
        let entries = logger.entries.lock().unwrap();
        assert_eq!(
            entries[1].1.as_deref(),
            Some("Engine error (status 503): unavailable")
        );
    }

    #[tokio::test]
    async fn test_validation_fails_before_logging_or_transport() {
        let (adapter, transport, logger) = adapter();

        let err = adapter
            .get_document::<Value>(&GetDocumentRequest::new("books", ""))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(logger.messages().is_empty());
        assert_eq!(transport.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_index_document_synthesizes_missing_id() {
        let (adapter, _, logger) = adapter();

        let response = adapter
            .index_document(&IndexDocumentRequest::new("books", json!({"title": "A"})))
            .await
            .unwrap();

        assert_eq!(response.id, "doc-1");
        assert_eq!(response.result, "created");
        assert_eq!(
            logger.data("indexDocument:start"),
            Some(json!({"index": "books", "id": "doc-1"}))
        );
    }

    #[tokio::test]
    async fn test_replace_document_overwrites() {
        let (adapter, transport, _) = adapter();
        adapter
            .index_document(&IndexDocumentRequest::new("books", json!({"title": "A"})).with_id("D1"))
            .await
            .unwrap();

        let response = adapter
            .replace_document(
                &ReplaceDocumentRequest::new("books", "D1", json!({"title": "B"}))
                    .with_refresh(RefreshPolicy::WaitFor),
            )
            .await
            .unwrap();

        assert_eq!(response.result, "updated");
        assert_eq!(response.version, Some(2));
        assert_eq!(
            transport.refresh_policies(),
            vec![RefreshPolicy::NoWait, RefreshPolicy::WaitFor]
        );
    }

    #[tokio::test]
    async fn test_batch_write_logs_took_and_errors() {
        let (adapter, _, logger) = adapter();
        let request = BatchWriteRequest::new(vec![
            BatchOperation::create("books", json!({"title": "A"})).with_id("D1"),
            BatchOperation::create("books", json!({"title": "A"})).with_id("D1"),
        ]);

        let response = adapter.batch_write(&request).await.unwrap();

        assert!(response.errors);
        assert_eq!(logger.data("batchWrite:start"), Some(json!({"count": 2})));
        let success = logger.data("batchWrite:success").unwrap();
        assert_eq!(success["errors"], json!(true));
        assert!(success.get("took").is_some());
    }

    #[tokio::test]
    async fn test_batch_write_validation_fails_before_logging() {
        let (adapter, transport, logger) = adapter();
        let request: BatchWriteRequest = BatchWriteRequest::new(vec![
            BatchOperation::index("books", json!({"title": "A"})),
            BatchOperation::delete("books", ""),
        ]);

        let err = adapter.batch_write(&request).await.unwrap_err();

        assert!(err.is_validation());
        assert!(logger.messages().is_empty());
        assert_eq!(transport.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_search_logs_normalized_total() {
        let (adapter, _, logger) = adapter();
        adapter
            .index_document(&IndexDocumentRequest::new("books", json!({"title": "A"})))
            .await
            .unwrap();

        let response = adapter
            .search::<Value>(&SearchRequest::new("books", json!({"query": {"match_all": {}}})))
            .await
            .unwrap();

        assert_eq!(response.total(), 1);
        let success = logger.data("search:success").unwrap();
        assert_eq!(success["hits"], json!(1));
    }

    #[tokio::test]
    async fn test_works_without_logger() {
        let transport = Arc::new(InMemoryTransport::new());
        let adapter = SearchAdapter::new(AdapterContext::new(transport.clone()));

        let response = adapter
            .batch_get::<Value>(&BatchGetRequest::new("books", ["A"]))
            .await
            .unwrap();

        assert_eq!(response.docs.len(), 1);
        assert!(!response.docs[0].found);
        assert_eq!(transport.calls().mget, 1);
    }
}
