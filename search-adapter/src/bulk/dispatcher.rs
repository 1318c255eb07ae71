//! Batch dispatcher.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::bulk::BulkCompiler;
use crate::config::SearchAdapterConfig;
use crate::errors::SearchAdapterError;
use crate::interfaces::{IdGenerator, SearchTransport};
use crate::responses::BulkResponse;
use crate::types::{BatchOperation, RefreshPolicy};

/// Compiles a batch and submits it in one bulk round trip.
pub struct BatchDispatcher<'a> {
    transport: &'a dyn SearchTransport,
    ids: &'a dyn IdGenerator,
    config: &'a SearchAdapterConfig,
}

impl<'a> BatchDispatcher<'a> {
    pub fn new(
        transport: &'a dyn SearchTransport,
        ids: &'a dyn IdGenerator,
        config: &'a SearchAdapterConfig,
    ) -> Self {
        Self {
            transport,
            ids,
            config,
        }
    }

    /// Dispatch `operations` as a single bulk request.
    ///
    /// An empty batch returns [`BulkResponse::empty`] without contacting the
    /// engine. Otherwise the engine's response is returned as is: a response
    /// with `errors == true` is still `Ok`, and callers must inspect the items.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResponse)` - One item per operation, in input order
    /// * `Err(SearchAdapterError::ValidationError)` - If the batch fails compilation or exceeds `max_batch_size`
    /// * `Err(SearchAdapterError::BulkDispatchError)` - If the submission itself failed
    pub async fn dispatch<T: Serialize>(
        &self,
        operations: &[BatchOperation<T>],
        refresh: RefreshPolicy,
    ) -> Result<BulkResponse, SearchAdapterError> {
        if operations.is_empty() {
            debug!("Empty batch, skipping bulk request");
            return Ok(BulkResponse::empty());
        }

        self.validate(operations)?;

        let lines = BulkCompiler::new(self.ids).compile(operations)?;

        let started = Instant::now();
        let response = self
            .transport
            .bulk(&lines, refresh)
            .await
            .map_err(|e| {
                error!(
                    operation_count = operations.len(),
                    error = %e,
                    "Bulk request failed"
                );
                SearchAdapterError::bulk_dispatch(operations.len(), e)
            })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if response.errors {
            warn!(
                operation_count = operations.len(),
                took = response.took,
                elapsed_ms,
                "Bulk request completed with item failures"
            );
        } else {
            debug!(
                operation_count = operations.len(),
                took = response.took,
                elapsed_ms,
                "Bulk request completed"
            );
        }

        Ok(response)
    }

    /// Check the batch against `max_batch_size` and every operation against
    /// the compiler's rules, without contacting the engine.
    pub fn validate<T>(&self, operations: &[BatchOperation<T>]) -> Result<(), SearchAdapterError> {
        self.validate_batch_size(operations.len())?;
        BulkCompiler::validate_all(operations)
    }

    fn validate_batch_size(&self, size: usize) -> Result<(), SearchAdapterError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchAdapterError::validation(format!(
                    "Batch size {} exceeds maximum {}",
                    size, max
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{SequentialIdGenerator, UuidGenerator};
    use crate::memory::InMemoryTransport;
    use crate::types::BatchActionKind;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_empty_batch_skips_transport() {
        let transport = InMemoryTransport::new();
        let config = SearchAdapterConfig::default();
        let dispatcher = BatchDispatcher::new(&transport, &UuidGenerator, &config);

        let ops: Vec<BatchOperation<Value>> = vec![];
        let response = dispatcher.dispatch(&ops, RefreshPolicy::Immediate).await.unwrap();

        assert!(!response.errors);
        assert!(response.items.is_empty());
        assert_eq!(response.took, 0);
        assert_eq!(transport.calls().bulk, 0);
    }

    #[tokio::test]
    async fn test_dispatch_returns_one_item_per_operation() {
        let transport = InMemoryTransport::new();
        let config = SearchAdapterConfig::default();
        let ids = SequentialIdGenerator::new("gen");
        let dispatcher = BatchDispatcher::new(&transport, &ids, &config);

        let ops = vec![
            BatchOperation::index("books", json!({"title": "A"})),
            BatchOperation::index("books", json!({"title": "B"})).with_id("B"),
            BatchOperation::delete("books", "B"),
        ];
        let response = dispatcher.dispatch(&ops, RefreshPolicy::NoWait).await.unwrap();

        assert_eq!(transport.calls().bulk, 1);
        assert!(!response.errors);
        assert_eq!(response.items.len(), 3);
        assert_eq!(response.items[0].status.id.as_deref(), Some("gen-1"));
        assert_eq!(response.items[2].action, BatchActionKind::Delete);
        assert_eq!(response.items[2].status.result.as_deref(), Some("deleted"));
    }

    #[tokio::test]
    async fn test_compile_error_never_reaches_transport() {
        let transport = InMemoryTransport::new();
        let config = SearchAdapterConfig::default();
        let dispatcher = BatchDispatcher::new(&transport, &UuidGenerator, &config);

        let ops: Vec<BatchOperation> = vec![BatchOperation::delete("books", "")];
        let err = dispatcher.dispatch(&ops, RefreshPolicy::NoWait).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(transport.calls().bulk, 0);
    }

    #[tokio::test]
    async fn test_max_batch_size() {
        let transport = InMemoryTransport::new();
        let config = SearchAdapterConfig::with_max_batch_size(2);
        let dispatcher = BatchDispatcher::new(&transport, &UuidGenerator, &config);

        let ops: Vec<BatchOperation> = (0..3)
            .map(|i| BatchOperation::index("books", json!({ "n": i })))
            .collect();
        let err = dispatcher.dispatch(&ops, RefreshPolicy::NoWait).await.unwrap_err();

        assert_eq!(err.to_string(), "Validation error: Batch size 3 exceeds maximum 2");
        assert_eq!(transport.calls().bulk, 0);
    }

    #[test]
    fn test_validate_checks_size_then_operations() {
        let transport = InMemoryTransport::new();
        let config = SearchAdapterConfig::with_max_batch_size(1);
        let dispatcher = BatchDispatcher::new(&transport, &UuidGenerator, &config);

        let oversized: Vec<BatchOperation> = vec![
            BatchOperation::delete("books", ""),
            BatchOperation::delete("books", ""),
        ];
        let err = dispatcher.validate(&oversized).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum 1"));

        let missing_id: Vec<BatchOperation> = vec![BatchOperation::delete("books", "")];
        let err = dispatcher.validate(&missing_id).unwrap_err();
        assert!(err.to_string().contains("id is required"));
        assert_eq!(transport.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_tagged_with_count() {
        let transport = InMemoryTransport::new();
        transport.fail_next(SearchAdapterError::transport("connection reset"));
        let config = SearchAdapterConfig::default();
        let dispatcher = BatchDispatcher::new(&transport, &UuidGenerator, &config);

        let ops = vec![
            BatchOperation::index("books", json!({})),
            BatchOperation::index("books", json!({})),
        ];
        let err = dispatcher.dispatch(&ops, RefreshPolicy::NoWait).await.unwrap_err();

        match err {
            SearchAdapterError::BulkDispatchError {
                operation_count,
                source,
            } => {
                assert_eq!(operation_count, 2);
                assert!(matches!(*source, SearchAdapterError::TransportError(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(transport.calls().bulk, 1);
    }

    #[tokio::test]
    async fn test_partial_failure_is_not_an_error() {
        let transport = InMemoryTransport::new();
        let config = SearchAdapterConfig::default();
        let dispatcher = BatchDispatcher::new(&transport, &UuidGenerator, &config);

        let ops = vec![
            BatchOperation::create("books", json!({"v": 1})).with_id("D1"),
            BatchOperation::create("books", json!({"v": 2})).with_id("D1"),
        ];
        let response = dispatcher.dispatch(&ops, RefreshPolicy::NoWait).await.unwrap();

        assert!(response.errors);
        assert!(response.items[0].is_success());
        assert!(!response.items[1].is_success());
        assert_eq!(response.items[1].status.status, 409);
    }
}
