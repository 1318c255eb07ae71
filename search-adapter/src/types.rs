//! Request types for search adapter operations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SearchAdapterError;

/// Controls when a write becomes visible to subsequent reads and searches.
///
/// Never affects whether the write itself succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Return as soon as the write is acknowledged.
    #[default]
    NoWait,
    /// Block until a scheduled refresh makes the write visible.
    WaitFor,
    /// Force an immediate refresh of the affected shards.
    Immediate,
}

/// The action verb of a single bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchActionKind {
    /// Create or overwrite the document.
    Index,
    /// Create the document, failing if the id already exists.
    Create,
    /// Apply the body to an existing document.
    Update,
    /// Remove the document.
    Delete,
}

impl BatchActionKind {
    /// The wire verb used as the key of the action line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Whether the action line is followed by a body line.
    pub fn has_body(&self) -> bool {
        !matches!(self, Self::Delete)
    }
}

impl fmt::Display for BatchActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchActionKind {
    type Err = SearchAdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(Self::Index),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(SearchAdapterError::validation(format!(
                "Unrecognized batch action '{}', expected one of index, create, update, delete",
                other
            ))),
        }
    }
}

/// One item of a batch write.
///
/// `body` is required in practice for `index`, `create` and `update`; a
/// missing body is sent as an empty object. It is ignored for `delete`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperation<T = Value> {
    /// The action verb.
    pub kind: BatchActionKind,
    /// Destination index name.
    pub index: String,
    /// Caller-supplied document id.
    pub id: Option<String>,
    /// Document body.
    pub body: Option<T>,
}

impl<T> BatchOperation<T> {
    /// An `index` operation; the id is synthesized unless set with [`Self::with_id`].
    pub fn index(index: impl Into<String>, body: T) -> Self {
        Self {
            kind: BatchActionKind::Index,
            index: index.into(),
            id: None,
            body: Some(body),
        }
    }

    /// A `create` operation; the id is synthesized unless set with [`Self::with_id`].
    pub fn create(index: impl Into<String>, body: T) -> Self {
        Self {
            kind: BatchActionKind::Create,
            index: index.into(),
            id: None,
            body: Some(body),
        }
    }

    /// An `update` operation on an existing document.
    pub fn update(index: impl Into<String>, id: impl Into<String>, body: T) -> Self {
        Self {
            kind: BatchActionKind::Update,
            index: index.into(),
            id: Some(id.into()),
            body: Some(body),
        }
    }

    /// A `delete` operation.
    pub fn delete(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: BatchActionKind::Delete,
            index: index.into(),
            id: Some(id.into()),
            body: None,
        }
    }

    /// Set the document id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Input of `batch_write`.
#[derive(Debug, Clone)]
pub struct BatchWriteRequest<T = Value> {
    /// Operations, executed by the engine in this order.
    pub operations: Vec<BatchOperation<T>>,
    /// Visibility policy for the whole batch.
    pub refresh: RefreshPolicy,
}

impl<T> BatchWriteRequest<T> {
    /// Create a request with the default refresh policy.
    pub fn new(operations: Vec<BatchOperation<T>>) -> Self {
        Self {
            operations,
            refresh: RefreshPolicy::default(),
        }
    }

    /// Set the refresh policy.
    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Input of `batch_get`. Order and duplicates in `ids` are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchGetRequest {
    /// Index to read from.
    pub index: String,
    /// Ids to fetch.
    pub ids: Vec<String>,
}

impl BatchGetRequest {
    pub fn new<I, S>(index: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index: index.into(),
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Input of `create_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexRequest {
    /// Index name.
    pub index: String,
    /// Optional settings and mappings.
    pub body: Option<Value>,
}

impl CreateIndexRequest {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            body: None,
        }
    }

    /// Attach settings and mappings.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Input of `update_mapping`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateMappingRequest {
    /// Index name.
    pub index: String,
    /// Mapping body, e.g. `{"properties": {...}}`.
    pub body: Value,
}

impl UpdateMappingRequest {
    pub fn new(index: impl Into<String>, body: Value) -> Self {
        Self {
            index: index.into(),
            body,
        }
    }
}

/// Input of `index_document`. A missing id is synthesized.
#[derive(Debug, Clone)]
pub struct IndexDocumentRequest<T = Value> {
    pub index: String,
    pub id: Option<String>,
    pub body: T,
    pub refresh: RefreshPolicy,
}

impl<T> IndexDocumentRequest<T> {
    pub fn new(index: impl Into<String>, body: T) -> Self {
        Self {
            index: index.into(),
            id: None,
            body,
            refresh: RefreshPolicy::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Input of `replace_document`. The id is required.
#[derive(Debug, Clone)]
pub struct ReplaceDocumentRequest<T = Value> {
    pub index: String,
    pub id: String,
    pub body: T,
    pub refresh: RefreshPolicy,
}

impl<T> ReplaceDocumentRequest<T> {
    pub fn new(index: impl Into<String>, id: impl Into<String>, body: T) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            body,
            refresh: RefreshPolicy::default(),
        }
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Input of `get_document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDocumentRequest {
    pub index: String,
    pub id: String,
}

impl GetDocumentRequest {
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
        }
    }
}

/// Input of `delete_document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDocumentRequest {
    pub index: String,
    pub id: String,
    pub refresh: RefreshPolicy,
}

impl DeleteDocumentRequest {
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            refresh: RefreshPolicy::default(),
        }
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Input of `search`.
///
/// `body` is the engine's query DSL, passed through unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: String,
    pub body: Value,
    pub size: Option<u64>,
    pub from: Option<u64>,
}

impl SearchRequest {
    pub fn new(index: impl Into<String>, body: Value) -> Self {
        Self {
            index: index.into(),
            body,
            size: None,
            from: None,
        }
    }

    /// Set the page size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the offset of the first hit.
    pub fn with_from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_kind_from_str() {
        assert_eq!("index".parse::<BatchActionKind>().unwrap(), BatchActionKind::Index);
        assert_eq!("delete".parse::<BatchActionKind>().unwrap(), BatchActionKind::Delete);

        let err = "upsert".parse::<BatchActionKind>().unwrap_err();
        assert!(matches!(err, SearchAdapterError::ValidationError(_)));
    }

    #[test]
    fn test_action_kind_serde_is_lowercase() {
        assert_eq!(serde_json::to_value(BatchActionKind::Create).unwrap(), json!("create"));
        let kind: BatchActionKind = serde_json::from_value(json!("update")).unwrap();
        assert_eq!(kind, BatchActionKind::Update);
    }

    #[test]
    fn test_only_delete_has_no_body() {
        assert!(BatchActionKind::Index.has_body());
        assert!(BatchActionKind::Create.has_body());
        assert!(BatchActionKind::Update.has_body());
        assert!(!BatchActionKind::Delete.has_body());
    }

    #[test]
    fn test_operation_constructors() {
        let op = BatchOperation::index("books", json!({"title": "A"}));
        assert_eq!(op.kind, BatchActionKind::Index);
        assert!(op.id.is_none());

        let op = op.with_id("D1");
        assert_eq!(op.id.as_deref(), Some("D1"));

        let op: BatchOperation = BatchOperation::delete("books", "D1");
        assert!(op.body.is_none());
        assert_eq!(op.id.as_deref(), Some("D1"));
    }

    #[test]
    fn test_refresh_policy_defaults_to_no_wait() {
        assert_eq!(RefreshPolicy::default(), RefreshPolicy::NoWait);
    }
}
