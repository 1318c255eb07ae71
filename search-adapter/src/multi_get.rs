//! Multi-get: fetching several documents of one index in one round trip.

use serde_json::{json, Value};
use tracing::debug;

use crate::errors::SearchAdapterError;
use crate::interfaces::SearchTransport;
use crate::responses::MultiGetResponse;
use crate::types::BatchGetRequest;
use crate::utils;

/// Wire body of a multi-get request. Order and duplicates are preserved.
pub fn mget_body(ids: &[String]) -> Value {
    json!({ "ids": ids })
}

/// Submits multi-get requests and checks the shape of the answer.
pub struct MultiGetDispatcher<'a> {
    transport: &'a dyn SearchTransport,
}

impl<'a> MultiGetDispatcher<'a> {
    pub fn new(transport: &'a dyn SearchTransport) -> Self {
        Self { transport }
    }

    /// Fetch every id of `request`.
    ///
    /// An empty id list returns an empty response without contacting the
    /// engine, which would reject the request.
    ///
    /// # Returns
    ///
    /// * `Ok(MultiGetResponse)` - One entry per requested id, element for element
    /// * `Err(SearchAdapterError::ValidationError)` - If the index is empty
    /// * `Err(SearchAdapterError::ParseError)` - If the engine returned a different number of entries
    pub async fn fetch(
        &self,
        request: &BatchGetRequest,
    ) -> Result<MultiGetResponse<Value>, SearchAdapterError> {
        utils::validate_index(&request.index)?;

        if request.ids.is_empty() {
            debug!(index = %request.index, "Empty id list, skipping multi-get request");
            return Ok(MultiGetResponse::empty());
        }

        let response = self.transport.mget(&request.index, &request.ids).await?;

        if response.docs.len() != request.ids.len() {
            return Err(SearchAdapterError::parse(format!(
                "multi-get returned {} entries for {} ids",
                response.docs.len(),
                request.ids.len()
            )));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTransport;
    use crate::types::RefreshPolicy;

    #[test]
    fn test_mget_body_keeps_duplicates_and_order() {
        let ids = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(mget_body(&ids), json!({"ids": ["b", "a", "b"]}));
    }

    #[tokio::test]
    async fn test_empty_ids_short_circuit() {
        let transport = InMemoryTransport::new();
        let dispatcher = MultiGetDispatcher::new(&transport);

        let response = dispatcher
            .fetch(&BatchGetRequest::new("books", Vec::<String>::new()))
            .await
            .unwrap();

        assert!(response.docs.is_empty());
        assert_eq!(transport.calls().mget, 0);
    }

    #[tokio::test]
    async fn test_empty_index_rejected() {
        let transport = InMemoryTransport::new();
        let dispatcher = MultiGetDispatcher::new(&transport);

        let err = dispatcher
            .fetch(&BatchGetRequest::new("", ["A"]))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(transport.calls().mget, 0);
    }

    #[tokio::test]
    async fn test_duplicates_preserved() {
        let transport = InMemoryTransport::new();
        transport
            .index_document("books", "A", &json!({"title": "A"}), RefreshPolicy::Immediate)
            .await
            .unwrap();
        let dispatcher = MultiGetDispatcher::new(&transport);

        let response = dispatcher
            .fetch(&BatchGetRequest::new("books", ["A", "Z", "A"]))
            .await
            .unwrap();

        let ids: Vec<&str> = response.docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "Z", "A"]);
        assert_eq!(response.found_count(), 2);
        assert!(response.docs[1].source.is_none());
    }
}
