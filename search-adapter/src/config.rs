//! Configuration types for the search adapter.

use std::env;

/// Default OpenSearch URL.
pub const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Configuration for the `SearchAdapter`.
#[derive(Debug, Clone, Default)]
pub struct SearchAdapterConfig {
    /// Maximum number of operations accepted in a single `batch_write`.
    ///
    /// `None` (the default) leaves batch size to the engine's own limits.
    pub max_batch_size: Option<usize>,
}

impl SearchAdapterConfig {
    /// Create a config with no batch size limit.
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
        }
    }

    /// Create a config that rejects batches larger than `max_batch_size`
    /// before they are compiled.
    ///
    /// # Arguments
    ///
    /// * `max_batch_size` - Maximum number of operations allowed in a single batch
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
        }
    }
}

/// Connection settings for `OpenSearchTransport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSearchConfig {
    /// The OpenSearch server URL (e.g., "http://localhost:9200").
    pub url: String,
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OPENSEARCH_URL.to_string(),
        }
    }
}

impl OpenSearchConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    pub fn from_env() -> Self {
        let url = env::var("OPENSEARCH_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string());
        Self { url }
    }
}
