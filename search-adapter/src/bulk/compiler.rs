//! Bulk compiler.
//!
//! The engine reads a bulk body positionally: an action line naming the verb,
//! index and id, followed by a body line for every verb except `delete`. There
//! is no tagging that would let the engine recover from a missing or extra
//! line, so a single misaligned operation corrupts every item after it.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::SearchAdapterError;
use crate::interfaces::IdGenerator;
use crate::types::{BatchActionKind, BatchOperation};
use crate::utils;

/// Metadata line of one bulk operation.
///
/// Serializes as `{"<verb>": {"_index": ..., "_id": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAction {
    pub kind: BatchActionKind,
    pub index: String,
    pub id: String,
}

impl Serialize for BulkAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Meta<'a> {
            #[serde(rename = "_index")]
            index: &'a str,
            #[serde(rename = "_id")]
            id: &'a str,
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            self.kind.as_str(),
            &Meta {
                index: &self.index,
                id: &self.id,
            },
        )?;
        map.end()
    }
}

/// One line of a compiled bulk body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BulkLine {
    Action(BulkAction),
    Source(Value),
}

impl BulkLine {
    pub fn is_action(&self) -> bool {
        matches!(self, Self::Action(_))
    }

    pub fn as_action(&self) -> Option<&BulkAction> {
        match self {
            Self::Action(action) => Some(action),
            Self::Source(_) => None,
        }
    }

    /// The line as a JSON value, ready for the wire.
    pub fn to_value(&self) -> Result<Value, SearchAdapterError> {
        serde_json::to_value(self).map_err(|e| SearchAdapterError::serialization(e.to_string()))
    }
}

/// Number of lines `operations` compile to: two per non-delete, one per delete.
pub fn expected_line_count<T>(operations: &[BatchOperation<T>]) -> usize {
    operations
        .iter()
        .map(|op| if op.kind.has_body() { 2 } else { 1 })
        .sum()
}

/// Compiles batch operations into an ordered bulk body.
///
/// Ids missing from `index` and `create` operations are drawn from the
/// injected [`IdGenerator`], once per operation.
pub struct BulkCompiler<'a> {
    ids: &'a dyn IdGenerator,
}

impl<'a> BulkCompiler<'a> {
    pub fn new(ids: &'a dyn IdGenerator) -> Self {
        Self { ids }
    }

    /// Compile `operations` in order.
    ///
    /// The whole batch is validated before anything is emitted, so a bad item
    /// anywhere fails the call without drawing ids for the others.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<BulkLine>)` - `expected_line_count(operations)` lines
    /// * `Err(SearchAdapterError::ValidationError)` - Empty index, or `delete`/`update` without an id
    /// * `Err(SearchAdapterError::SerializationError)` - If a body cannot be serialized
    pub fn compile<T: Serialize>(
        &self,
        operations: &[BatchOperation<T>],
    ) -> Result<Vec<BulkLine>, SearchAdapterError> {
        Self::validate_all(operations)?;

        let mut lines = Vec::with_capacity(expected_line_count(operations));
        for op in operations {
            let id = match caller_id(op) {
                Some(id) => id.to_string(),
                None => self.ids.generate(),
            };

            lines.push(BulkLine::Action(BulkAction {
                kind: op.kind,
                index: op.index.clone(),
                id,
            }));

            if op.kind.has_body() {
                let source = match &op.body {
                    Some(body) => serde_json::to_value(body)
                        .map_err(|e| SearchAdapterError::serialization(e.to_string()))?,
                    None => Value::Object(Map::new()),
                };
                lines.push(BulkLine::Source(source));
            }
        }

        Ok(lines)
    }

    /// Check every operation without compiling anything.
    ///
    /// Fails on the first operation with an empty index, or an `update`/`delete`
    /// without an id.
    pub fn validate_all<T>(operations: &[BatchOperation<T>]) -> Result<(), SearchAdapterError> {
        operations
            .iter()
            .enumerate()
            .try_for_each(|(position, op)| Self::validate(position, op))
    }

    fn validate<T>(position: usize, op: &BatchOperation<T>) -> Result<(), SearchAdapterError> {
        utils::validate_index(&op.index).map_err(|_| {
            SearchAdapterError::validation(format!(
                "operation {} ({}): index is required",
                position, op.kind
            ))
        })?;

        if caller_id(op).is_none() {
            match op.kind {
                BatchActionKind::Index | BatchActionKind::Create => {}
                BatchActionKind::Update | BatchActionKind::Delete => {
                    return Err(SearchAdapterError::validation(format!(
                        "operation {} ({}): id is required",
                        position, op.kind
                    )));
                }
            }
        }

        Ok(())
    }
}

/// The caller-supplied id, treating an empty string as absent.
fn caller_id<T>(op: &BatchOperation<T>) -> Option<&str> {
    op.id.as_deref().filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{SequentialIdGenerator, UuidGenerator};
    use serde_json::json;
    use std::collections::HashSet;

    fn action(line: &BulkLine) -> &BulkAction {
        line.as_action().expect("expected an action line")
    }

    #[test]
    fn test_action_line_wire_shape() {
        let line = BulkLine::Action(BulkAction {
            kind: BatchActionKind::Create,
            index: "books".to_string(),
            id: "D1".to_string(),
        });

        assert_eq!(
            line.to_value().unwrap(),
            json!({"create": {"_index": "books", "_id": "D1"}})
        );
        assert_eq!(
            BulkLine::Source(json!({"title": "A"})).to_value().unwrap(),
            json!({"title": "A"})
        );
    }

    #[test]
    fn test_mixed_batch_layout() {
        let ids = SequentialIdGenerator::new("gen");
        let ops = vec![
            BatchOperation::index("books", json!({"title": "A"})).with_id("D1"),
            BatchOperation::delete("books", "D2"),
            BatchOperation::create("books", json!({"title": "C"})),
            BatchOperation::update("books", "D1", json!({"doc": {"title": "B"}})),
            BatchOperation::delete("books", "D3"),
        ];

        let lines = BulkCompiler::new(&ids).compile(&ops).unwrap();

        assert_eq!(lines.len(), 2 + 1 + 2 + 2 + 1);
        assert_eq!(lines.len(), expected_line_count(&ops));

        let shape: Vec<bool> = lines.iter().map(BulkLine::is_action).collect();
        assert_eq!(shape, vec![true, false, true, true, false, true, false, true]);

        assert_eq!(action(&lines[0]).id, "D1");
        assert_eq!(lines[1], BulkLine::Source(json!({"title": "A"})));
        assert_eq!(action(&lines[2]).kind, BatchActionKind::Delete);
        assert_eq!(action(&lines[3]).id, "gen-1");
        assert_eq!(lines[4], BulkLine::Source(json!({"title": "C"})));
        assert_eq!(action(&lines[5]).kind, BatchActionKind::Update);
        assert_eq!(lines[6], BulkLine::Source(json!({"doc": {"title": "B"}})));
        assert_eq!(action(&lines[7]).id, "D3");
    }

    #[test]
    fn test_every_body_follows_its_action() {
        let ids = UuidGenerator;
        let ops: Vec<BatchOperation> = (0..50)
            .map(|i| match i % 3 {
                0 => BatchOperation::index("books", json!({ "n": i })),
                1 => BatchOperation::delete("books", format!("d{}", i)),
                _ => BatchOperation::update("books", format!("u{}", i), json!({ "doc": {"n": i} })),
            })
            .collect();

        let lines = BulkCompiler::new(&ids).compile(&ops).unwrap();

        let mut cursor = 0;
        for op in &ops {
            let head = action(&lines[cursor]);
            assert_eq!(head.kind, op.kind);
            cursor += 1;
            if op.kind.has_body() {
                assert!(!lines[cursor].is_action());
                cursor += 1;
            }
        }
        assert_eq!(cursor, lines.len());
    }

    #[test]
    fn test_missing_body_becomes_empty_object() {
        let ids = UuidGenerator;
        let ops = vec![BatchOperation::<Value> {
            kind: BatchActionKind::Index,
            index: "books".to_string(),
            id: Some("D1".to_string()),
            body: None,
        }];

        let lines = BulkCompiler::new(&ids).compile(&ops).unwrap();
        assert_eq!(lines[1], BulkLine::Source(json!({})));
    }

    #[test]
    fn test_delete_ignores_body() {
        let ids = UuidGenerator;
        let ops = vec![BatchOperation {
            kind: BatchActionKind::Delete,
            index: "books".to_string(),
            id: Some("D1".to_string()),
            body: Some(json!({"ignored": true})),
        }];

        let lines = BulkCompiler::new(&ids).compile(&ops).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_synthesized_ids_are_unique() {
        let ids = UuidGenerator;
        let ops: Vec<BatchOperation> = (0..10_000)
            .map(|i| {
                if i % 2 == 0 {
                    BatchOperation::index("books", json!({ "n": i }))
                } else {
                    BatchOperation::create("books", json!({ "n": i }))
                }
            })
            .collect();

        let lines = BulkCompiler::new(&ids).compile(&ops).unwrap();

        let synthesized: HashSet<&str> = lines
            .iter()
            .filter_map(BulkLine::as_action)
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(synthesized.len(), 10_000);
        assert!(synthesized.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn test_caller_id_used_verbatim() {
        let ids = SequentialIdGenerator::new("gen");
        let ops = vec![BatchOperation::create("books", json!({})).with_id("my id/with spaces")];

        let lines = BulkCompiler::new(&ids).compile(&ops).unwrap();
        assert_eq!(action(&lines[0]).id, "my id/with spaces");
        // no id was drawn for the caller-supplied one
        assert_eq!(ids.generate(), "gen-1");
    }

    #[test]
    fn test_empty_caller_id_is_synthesized_for_index() {
        let ids = SequentialIdGenerator::new("gen");
        let ops = vec![BatchOperation::index("books", json!({})).with_id("")];

        let lines = BulkCompiler::new(&ids).compile(&ops).unwrap();
        assert_eq!(action(&lines[0]).id, "gen-1");
    }

    #[test]
    fn test_delete_without_id_fails() {
        let ids = UuidGenerator;
        let ops = vec![BatchOperation::<Value> {
            kind: BatchActionKind::Delete,
            index: "books".to_string(),
            id: None,
            body: None,
        }];

        let err = BulkCompiler::new(&ids).compile(&ops).unwrap_err();
        assert!(matches!(err, SearchAdapterError::ValidationError(_)));
        assert!(err.to_string().contains("operation 0 (delete)"));
    }

    #[test]
    fn test_update_without_id_fails() {
        let ids = UuidGenerator;
        let ops = vec![
            BatchOperation::index("books", json!({})),
            BatchOperation::update("books", "", json!({"doc": {}})),
        ];

        let err = BulkCompiler::new(&ids).compile(&ops).unwrap_err();
        assert!(err.to_string().contains("operation 1 (update): id is required"));
    }

    #[test]
    fn test_empty_index_fails_before_any_id_is_drawn() {
        let ids = SequentialIdGenerator::new("gen");
        let ops = vec![
            BatchOperation::index("books", json!({})),
            BatchOperation::index("", json!({})),
        ];

        let err = BulkCompiler::new(&ids).compile(&ops).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(ids.generate(), "gen-1");
    }

    #[test]
    fn test_validate_all() {
        let valid = vec![
            BatchOperation::index("books", json!({})),
            BatchOperation::delete("books", "D1"),
        ];
        assert!(BulkCompiler::validate_all(&valid).is_ok());

        let invalid = vec![
            BatchOperation::index("books", json!({})),
            BatchOperation::delete("books", ""),
        ];
        let err = BulkCompiler::validate_all(&invalid).unwrap_err();
        assert!(err.to_string().contains("operation 1 (delete): id is required"));
    }
}
