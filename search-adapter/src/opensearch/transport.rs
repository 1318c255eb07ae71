//! OpenSearch transport implementation.
//!
//! This module provides the concrete implementation of `SearchTransport`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{
        IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetMappingParts,
        IndicesGetParts, IndicesPutMappingParts,
    },
    params::{OpType, Refresh},
    BulkParts, DeleteParts, GetParts, IndexParts, MgetParts, OpenSearch, SearchParts,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::bulk::BulkLine;
use crate::config::OpenSearchConfig;
use crate::errors::SearchAdapterError;
use crate::interfaces::SearchTransport;
use crate::multi_get;
use crate::responses::{
    AcknowledgedResponse, BulkResponse, GetResponse, MultiGetResponse, SearchResponse,
    WriteResponse,
};
use crate::types::{RefreshPolicy, SearchRequest};

/// OpenSearch-backed transport.
///
/// Every trait method issues exactly one HTTP request. Non-success statuses
/// are reported as `EngineError` with the response body, except a 404 on a
/// single-document get or delete, which is reported as `DocumentNotFound`.
///
/// # Example
///
/// ```ignore
/// use search_adapter::{OpenSearchConfig, OpenSearchTransport};
///
/// let transport = OpenSearchTransport::from_config(&OpenSearchConfig::from_env())?;
/// let exists = transport.index_exists("books").await?;
/// ```
pub struct OpenSearchTransport {
    client: OpenSearch,
}

impl OpenSearchTransport {
    /// Create a transport connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchTransport)` - A new transport instance
    /// * `Err(SearchAdapterError::ConnectionError)` - If the URL is invalid or connection setup fails
    pub fn new(url: &str) -> Result<Self, SearchAdapterError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchAdapterError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchAdapterError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch transport");

        Ok(Self { client })
    }

    /// Create a transport from connection settings.
    pub fn from_config(config: &OpenSearchConfig) -> Result<Self, SearchAdapterError> {
        Self::new(&config.url)
    }

    fn refresh(policy: RefreshPolicy) -> Refresh {
        match policy {
            RefreshPolicy::NoWait => Refresh::False,
            RefreshPolicy::WaitFor => Refresh::WaitFor,
            RefreshPolicy::Immediate => Refresh::True,
        }
    }

    fn to_i64(value: u64, field: &str) -> Result<i64, SearchAdapterError> {
        i64::try_from(value)
            .map_err(|_| SearchAdapterError::validation(format!("{} is out of range", field)))
    }
}

fn send_error(operation: &str, e: opensearch::Error) -> SearchAdapterError {
    error!(operation, error = %e, "OpenSearch request could not be sent");
    SearchAdapterError::transport(e.to_string())
}

/// Pass a success response through; turn anything else into `EngineError`.
async fn ensure_success(response: Response, operation: &str) -> Result<Response, SearchAdapterError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(operation, status = %status, body = %body, "OpenSearch request failed");
    Err(SearchAdapterError::engine(status.as_u16(), body))
}

async fn parse_body<T: DeserializeOwned>(response: Response) -> Result<T, SearchAdapterError> {
    response
        .json::<T>()
        .await
        .map_err(|e| SearchAdapterError::parse(e.to_string()))
}

#[async_trait]
impl SearchTransport for OpenSearchTransport {
    async fn create_index(
        &self,
        index: &str,
        body: Option<&Value>,
    ) -> Result<AcknowledgedResponse, SearchAdapterError> {
        let body = body.cloned().unwrap_or_else(|| json!({}));

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| send_error("create_index", e))?;

        let response = ensure_success(response, "create_index").await?;
        debug!(index = %index, "Index created");
        parse_body(response).await
    }

    async fn get_index(&self, index: &str) -> Result<Value, SearchAdapterError> {
        let response = self
            .client
            .indices()
            .get(IndicesGetParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| send_error("get_index", e))?;

        parse_body(ensure_success(response, "get_index").await?).await
    }

    async fn delete_index(&self, index: &str) -> Result<AcknowledgedResponse, SearchAdapterError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| send_error("delete_index", e))?;

        let response = ensure_success(response, "delete_index").await?;
        debug!(index = %index, "Index deleted");
        parse_body(response).await
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchAdapterError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| send_error("index_exists", e))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => ensure_success(response, "index_exists").await.map(|_| true),
        }
    }

    async fn get_mapping(&self, index: &str) -> Result<Value, SearchAdapterError> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| send_error("get_mapping", e))?;

        parse_body(ensure_success(response, "get_mapping").await?).await
    }

    async fn put_mapping(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<AcknowledgedResponse, SearchAdapterError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| send_error("put_mapping", e))?;

        parse_body(ensure_success(response, "put_mapping").await?).await
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
        refresh: RefreshPolicy,
    ) -> Result<WriteResponse, SearchAdapterError> {
        let response = self
            .client
            .index(IndexParts::IndexId(index, id))
            .op_type(OpType::Index)
            .refresh(Self::refresh(refresh))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| send_error("index_document", e))?;

        parse_body(ensure_success(response, "index_document").await?).await
    }

    async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<GetResponse<Value>, SearchAdapterError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| send_error("get_document", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(SearchAdapterError::document_not_found(index, id));
        }

        parse_body(ensure_success(response, "get_document").await?).await
    }

    async fn delete_document(
        &self,
        index: &str,
        id: &str,
        refresh: RefreshPolicy,
    ) -> Result<WriteResponse, SearchAdapterError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .refresh(Self::refresh(refresh))
            .send()
            .await
            .map_err(|e| send_error("delete_document", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(SearchAdapterError::document_not_found(index, id));
        }

        parse_body(ensure_success(response, "delete_document").await?).await
    }

    async fn bulk(
        &self,
        lines: &[BulkLine],
        refresh: RefreshPolicy,
    ) -> Result<BulkResponse, SearchAdapterError> {
        let body = lines
            .iter()
            .map(|line| line.to_value().map(JsonBody::from))
            .collect::<Result<Vec<JsonBody<Value>>, _>>()?;

        let response = self
            .client
            .bulk(BulkParts::None)
            .refresh(Self::refresh(refresh))
            .body(body)
            .send()
            .await
            .map_err(|e| send_error("bulk", e))?;

        parse_body(ensure_success(response, "bulk").await?).await
    }

    async fn mget(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<MultiGetResponse<Value>, SearchAdapterError> {
        let response = self
            .client
            .mget(MgetParts::Index(index))
            .body(multi_get::mget_body(ids))
            .send()
            .await
            .map_err(|e| send_error("mget", e))?;

        parse_body(ensure_success(response, "mget").await?).await
    }

    async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResponse<Value>, SearchAdapterError> {
        let indices = [request.index.as_str()];
        let mut search = self
            .client
            .search(SearchParts::Index(&indices))
            .body(request.body.clone());
        if let Some(size) = request.size {
            search = search.size(Self::to_i64(size, "size")?);
        }
        if let Some(from) = request.from {
            search = search.from(Self::to_i64(from, "from")?);
        }

        let response = search
            .send()
            .await
            .map_err(|e| send_error("search", e))?;

        parse_body(ensure_success(response, "search").await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_connection_error() {
        let result = OpenSearchTransport::new("not a url");
        assert!(matches!(result, Err(SearchAdapterError::ConnectionError(_))));
    }

    #[test]
    fn test_from_config() {
        let config = OpenSearchConfig::new("http://localhost:9200");
        assert!(OpenSearchTransport::from_config(&config).is_ok());
    }

    #[test]
    fn test_refresh_mapping() {
        assert!(matches!(
            OpenSearchTransport::refresh(RefreshPolicy::NoWait),
            Refresh::False
        ));
        assert!(matches!(
            OpenSearchTransport::refresh(RefreshPolicy::WaitFor),
            Refresh::WaitFor
        ));
        assert!(matches!(
            OpenSearchTransport::refresh(RefreshPolicy::Immediate),
            Refresh::True
        ));
    }

    #[test]
    fn test_page_bounds_out_of_range() {
        let err = OpenSearchTransport::to_i64(u64::MAX, "size").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(OpenSearchTransport::to_i64(20, "from").unwrap(), 20);
    }
}
