//! Response types returned by the engine and handed back to callers.
//!
//! Shapes follow the engine's JSON. Types carrying a document `_source` are
//! generic over the document type and decode from `serde_json::Value` with
//! their `decode` methods.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SearchAdapterError;
use crate::types::BatchActionKind;

fn decode_source<T: DeserializeOwned>(
    source: Option<Value>,
    id: &str,
) -> Result<Option<T>, SearchAdapterError> {
    source
        .map(|value| {
            serde_json::from_value(value).map_err(|e| {
                SearchAdapterError::parse(format!("Invalid _source for document '{}': {}", id, e))
            })
        })
        .transpose()
}

/// Result envelope of a bulk request.
///
/// `errors` is true when at least one item failed; the engine still returns
/// one item per submitted operation, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    /// Engine-side execution time in milliseconds.
    pub took: u64,
    /// Whether any item failed.
    pub errors: bool,
    /// Per-operation results.
    pub items: Vec<BulkItemResult>,
}

impl BulkResponse {
    /// The envelope returned for an empty batch without contacting the engine.
    pub fn empty() -> Self {
        Self {
            took: 0,
            errors: false,
            items: Vec::new(),
        }
    }
}

/// Result of one bulk item, keyed on the wire by its action verb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "HashMap<String, BulkItemStatus>",
    into = "HashMap<String, BulkItemStatus>"
)]
pub struct BulkItemResult {
    /// The action this result answers.
    pub action: BatchActionKind,
    /// Outcome reported by the engine.
    pub status: BulkItemStatus,
}

impl BulkItemResult {
    /// Whether the item completed without an engine error.
    ///
    /// A `delete` of a missing document reports status 404 with result
    /// `not_found` and no error; it counts as a success here, as it does in
    /// the envelope's `errors` flag.
    pub fn is_success(&self) -> bool {
        self.status.error.is_none()
    }
}

impl TryFrom<HashMap<String, BulkItemStatus>> for BulkItemResult {
    type Error = String;

    fn try_from(map: HashMap<String, BulkItemStatus>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "bulk item must have exactly one action key, found {}",
                map.len()
            ));
        }
        let (key, status) = map
            .into_iter()
            .next()
            .ok_or_else(|| "bulk item is empty".to_string())?;
        let action = key.parse::<BatchActionKind>().map_err(|e| e.to_string())?;
        Ok(Self { action, status })
    }
}

impl From<BulkItemResult> for HashMap<String, BulkItemStatus> {
    fn from(item: BulkItemResult) -> Self {
        HashMap::from([(item.action.as_str().to_string(), item.status)])
    }
}

/// Per-item outcome inside a bulk response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemStatus {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// HTTP-style status of this item.
    pub status: u16,
    /// `created`, `updated`, `deleted`, `not_found`, `noop`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Engine error object when the item failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Response of a multi-get: one entry per requested id, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiGetResponse<T = Value> {
    pub docs: Vec<MultiGetDoc<T>>,
}

impl<T> MultiGetResponse<T> {
    pub fn empty() -> Self {
        Self { docs: Vec::new() }
    }

    /// Number of entries that were found.
    pub fn found_count(&self) -> usize {
        self.docs.iter().filter(|d| d.found).count()
    }
}

impl MultiGetResponse<Value> {
    /// Decode every `_source` into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<MultiGetResponse<T>, SearchAdapterError> {
        let docs = self
            .docs
            .into_iter()
            .map(MultiGetDoc::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MultiGetResponse { docs })
    }
}

/// One multi-get entry. Not-found entries carry no `_source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiGetDoc<T = Value> {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<T>,
    /// Per-entry engine error, e.g. a missing index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl MultiGetDoc<Value> {
    pub fn decode<T: DeserializeOwned>(self) -> Result<MultiGetDoc<T>, SearchAdapterError> {
        let source = decode_source(self.source, &self.id)?;
        Ok(MultiGetDoc {
            index: self.index,
            id: self.id,
            found: self.found,
            version: self.version,
            source,
            error: self.error,
        })
    }
}

/// Response of a single-document get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetResponse<T = Value> {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    pub found: bool,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(rename = "_seq_no", default, skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<u64>,
    #[serde(rename = "_primary_term", default, skip_serializing_if = "Option::is_none")]
    pub primary_term: Option<u64>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<T>,
}

impl GetResponse<Value> {
    pub fn decode<T: DeserializeOwned>(self) -> Result<GetResponse<T>, SearchAdapterError> {
        let source = decode_source(self.source, &self.id)?;
        Ok(GetResponse {
            index: self.index,
            id: self.id,
            found: self.found,
            version: self.version,
            seq_no: self.seq_no,
            primary_term: self.primary_term,
            source,
        })
    }
}

/// Response of a single-document write (index, replace, delete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// `created`, `updated`, `deleted`, `not_found`.
    pub result: String,
    #[serde(rename = "_seq_no", default, skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<u64>,
    #[serde(rename = "_primary_term", default, skip_serializing_if = "Option::is_none")]
    pub primary_term: Option<u64>,
}

/// Acknowledgement of an index-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgedResponse {
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shards_acknowledged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

impl AcknowledgedResponse {
    pub fn acknowledged() -> Self {
        Self {
            acknowledged: true,
            shards_acknowledged: None,
            index: None,
        }
    }
}

/// Total hit count, reported either as a bare number or as `{value, relation}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Detailed {
        value: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relation: Option<String>,
    },
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            Self::Count(count) => *count,
            Self::Detailed { value, .. } => *value,
        }
    }
}

/// Response of a search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse<T = Value> {
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    pub hits: SearchHits<T>,
}

impl<T> SearchResponse<T> {
    /// Total matching documents, whichever form the engine used. Zero when absent.
    pub fn total(&self) -> u64 {
        self.hits.total.as_ref().map(TotalHits::value).unwrap_or(0)
    }
}

impl SearchResponse<Value> {
    pub fn decode<T: DeserializeOwned>(self) -> Result<SearchResponse<T>, SearchAdapterError> {
        let hits = self
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let source = decode_source(hit.source, &hit.id)?;
                Ok(SearchHit {
                    index: hit.index,
                    id: hit.id,
                    score: hit.score,
                    source,
                })
            })
            .collect::<Result<Vec<_>, SearchAdapterError>>()?;

        Ok(SearchResponse {
            took: self.took,
            timed_out: self.timed_out,
            hits: SearchHits {
                total: self.hits.total,
                max_score: self.hits.max_score,
                hits,
            },
        })
    }
}

/// The `hits` section of a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHits<T = Value> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub max_score: Option<f64>,
    pub hits: Vec<SearchHit<T>>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit<T = Value> {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<T>,
}
