//! In-memory `SearchTransport` for tests and local development.
//!
//! Emulates the engine behaviour the adapter relies on: positional bulk
//! parsing, per-item statuses, version counters, mget entries for missing
//! ids and a subset of the query DSL. Writes are visible immediately
//! regardless of the refresh policy.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::bulk::{BulkAction, BulkLine};
use crate::errors::SearchAdapterError;
use crate::interfaces::SearchTransport;
use crate::memory::query::{self, SortKey};
use crate::responses::{
    AcknowledgedResponse, BulkItemResult, BulkItemStatus, BulkResponse, GetResponse,
    MultiGetDoc, MultiGetResponse, SearchHit, SearchHits, SearchResponse, TotalHits,
    WriteResponse,
};
use crate::types::{BatchActionKind, RefreshPolicy, SearchRequest};

const DEFAULT_PAGE_SIZE: u64 = 10;
const PRIMARY_TERM: u64 = 1;

/// Number of calls made to each transport method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportCalls {
    pub create_index: usize,
    pub get_index: usize,
    pub delete_index: usize,
    pub index_exists: usize,
    pub get_mapping: usize,
    pub put_mapping: usize,
    pub index_document: usize,
    pub get_document: usize,
    pub delete_document: usize,
    pub bulk: usize,
    pub mget: usize,
    pub search: usize,
}

impl TransportCalls {
    /// Total number of round trips.
    pub fn total(&self) -> usize {
        self.create_index
            + self.get_index
            + self.delete_index
            + self.index_exists
            + self.get_mapping
            + self.put_mapping
            + self.index_document
            + self.get_document
            + self.delete_document
            + self.bulk
            + self.mget
            + self.search
    }
}

#[derive(Debug, Clone)]
struct StoredDocument {
    source: Value,
    version: u64,
    seq_no: u64,
}

#[derive(Debug, Clone)]
struct StoredIndex {
    mappings: Value,
    settings: Value,
    documents: HashMap<String, StoredDocument>,
}

impl StoredIndex {
    fn new(body: Option<&Value>) -> Self {
        let section = |key: &str| {
            body.and_then(|b| b.get(key))
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()))
        };
        Self {
            mappings: section("mappings"),
            settings: section("settings"),
            documents: HashMap::new(),
        }
    }
}

/// Outcome of storing a document.
struct Upsert {
    created: bool,
    version: u64,
    seq_no: u64,
}

#[derive(Default)]
struct State {
    indices: BTreeMap<String, StoredIndex>,
    next_seq_no: u64,
    calls: TransportCalls,
    failures: VecDeque<SearchAdapterError>,
    bulk_requests: Vec<Vec<Value>>,
    refresh_policies: Vec<RefreshPolicy>,
}

impl State {
    fn take_failure(&mut self) -> Result<(), SearchAdapterError> {
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn index(&self, name: &str) -> Result<&StoredIndex, SearchAdapterError> {
        self.indices.get(name).ok_or_else(|| index_not_found(name))
    }

    fn index_mut(&mut self, name: &str) -> Result<&mut StoredIndex, SearchAdapterError> {
        self.indices.get_mut(name).ok_or_else(|| index_not_found(name))
    }

    fn contains(&self, index: &str, id: &str) -> bool {
        self.indices
            .get(index)
            .is_some_and(|i| i.documents.contains_key(id))
    }

    /// Store `source` under `id`, creating the index on first write.
    fn upsert(&mut self, index: &str, id: &str, source: Value) -> Upsert {
        self.next_seq_no += 1;
        let seq_no = self.next_seq_no;
        let documents = &mut self
            .indices
            .entry(index.to_string())
            .or_insert_with(|| StoredIndex::new(None))
            .documents;

        let (created, version) = match documents.get(id) {
            Some(existing) => (false, existing.version + 1),
            None => (true, 1),
        };
        documents.insert(
            id.to_string(),
            StoredDocument {
                source,
                version,
                seq_no,
            },
        );

        Upsert {
            created,
            version,
            seq_no,
        }
    }

    fn remove(&mut self, index: &str, id: &str) -> Option<StoredDocument> {
        self.indices
            .get_mut(index)
            .and_then(|i| i.documents.remove(id))
    }

    fn apply_bulk_item(&mut self, action: &BulkAction, source: Option<&Value>) -> BulkItemStatus {
        let index = action.index.as_str();
        let id = action.id.as_str();
        let source = source.cloned().unwrap_or_else(|| Value::Object(Map::new()));

        match action.kind {
            BatchActionKind::Index => {
                let upsert = self.upsert(index, id, source);
                written(index, id, &upsert)
            }
            BatchActionKind::Create => {
                if self.contains(index, id) {
                    return item_error(
                        index,
                        id,
                        409,
                        "version_conflict_engine_exception",
                        &format!("[{}]: version conflict, document already exists", id),
                    );
                }
                let upsert = self.upsert(index, id, source);
                written(index, id, &upsert)
            }
            BatchActionKind::Update => self.apply_update(index, id, &source),
            BatchActionKind::Delete => match self.remove(index, id) {
                Some(doc) => {
                    self.next_seq_no += 1;
                    item_status(index, id, 200, Some(doc.version + 1), "deleted")
                }
                None => item_status(index, id, 404, Some(1), "not_found"),
            },
        }
    }

    fn apply_update(&mut self, index: &str, id: &str, body: &Value) -> BulkItemStatus {
        let Some(partial) = body.get("doc").and_then(Value::as_object) else {
            return item_error(
                index,
                id,
                400,
                "action_request_validation_exception",
                "Validation Failed: 1: script or doc is missing;",
            );
        };
        let doc_as_upsert = body
            .get("doc_as_upsert")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let current = self
            .indices
            .get(index)
            .and_then(|i| i.documents.get(id))
            .map(|d| d.source.clone());

        let merged = match current {
            Some(Value::Object(mut fields)) => {
                for (key, value) in partial {
                    fields.insert(key.clone(), value.clone());
                }
                Value::Object(fields)
            }
            Some(_) | None if doc_as_upsert => Value::Object(partial.clone()),
            Some(_) | None => {
                return item_error(
                    index,
                    id,
                    404,
                    "document_missing_exception",
                    &format!("[{}]: document missing", id),
                );
            }
        };

        let upsert = self.upsert(index, id, merged);
        written(index, id, &upsert)
    }
}

fn engine_error(status: u16, kind: &str, reason: &str) -> SearchAdapterError {
    let body = json!({
        "error": {"type": kind, "reason": reason},
        "status": status,
    });
    SearchAdapterError::engine(status, body.to_string())
}

fn index_not_found(index: &str) -> SearchAdapterError {
    engine_error(
        404,
        "index_not_found_exception",
        &format!("no such index [{}]", index),
    )
}

fn malformed_bulk(reason: &str) -> SearchAdapterError {
    engine_error(400, "illegal_argument_exception", reason)
}

fn item_status(index: &str, id: &str, status: u16, version: Option<u64>, result: &str) -> BulkItemStatus {
    BulkItemStatus {
        index: index.to_string(),
        id: Some(id.to_string()),
        version,
        status,
        result: Some(result.to_string()),
        error: None,
    }
}

fn item_error(index: &str, id: &str, status: u16, kind: &str, reason: &str) -> BulkItemStatus {
    BulkItemStatus {
        index: index.to_string(),
        id: Some(id.to_string()),
        version: None,
        status,
        result: None,
        error: Some(json!({"type": kind, "reason": reason, "index": index})),
    }
}

fn written(index: &str, id: &str, upsert: &Upsert) -> BulkItemStatus {
    if upsert.created {
        item_status(index, id, 201, Some(upsert.version), "created")
    } else {
        item_status(index, id, 200, Some(upsert.version), "updated")
    }
}

fn result_name(upsert: &Upsert) -> &'static str {
    if upsert.created {
        "created"
    } else {
        "updated"
    }
}

/// Split bulk lines into (action, body) pairs the way the engine reads them.
fn pair_lines(lines: &[BulkLine]) -> Result<Vec<(&BulkAction, Option<&Value>)>, SearchAdapterError> {
    let mut pairs = Vec::new();
    let mut cursor = lines.iter().enumerate();

    while let Some((position, line)) = cursor.next() {
        let action = match line {
            BulkLine::Action(action) => action,
            BulkLine::Source(_) => {
                return Err(malformed_bulk(&format!(
                    "Malformed action/metadata line [{}], expected an action",
                    position + 1
                )));
            }
        };

        if !action.kind.has_body() {
            pairs.push((action, None));
            continue;
        }

        match cursor.next() {
            Some((_, BulkLine::Source(source))) => pairs.push((action, Some(source))),
            _ => {
                return Err(malformed_bulk(&format!(
                    "The bulk request must be terminated by a newline [{}]",
                    position + 1
                )));
            }
        }
    }

    Ok(pairs)
}

/// Engine emulator backing the adapter in tests.
///
/// Every call is counted in [`TransportCalls`]; a failure queued with
/// [`InMemoryTransport::fail_next`] is returned by the next call instead of
/// touching the stored state.
#[derive(Default)]
pub struct InMemoryTransport {
    state: Mutex<State>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Counts of calls made so far.
    pub fn calls(&self) -> TransportCalls {
        self.state().calls
    }

    /// Make the next call, whichever method it is, fail with `error`.
    pub fn fail_next(&self, error: SearchAdapterError) {
        self.state().failures.push_back(error);
    }

    /// The wire lines of every bulk request received, in order.
    pub fn bulk_requests(&self) -> Vec<Vec<Value>> {
        self.state().bulk_requests.clone()
    }

    /// Refresh policies received by write calls, in order.
    pub fn refresh_policies(&self) -> Vec<RefreshPolicy> {
        self.state().refresh_policies.clone()
    }

    /// Number of documents currently stored in `index`.
    pub fn document_count(&self, index: &str) -> usize {
        self.state()
            .indices
            .get(index)
            .map(|i| i.documents.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SearchTransport for InMemoryTransport {
    async fn create_index(
        &self,
        index: &str,
        body: Option<&Value>,
    ) -> Result<AcknowledgedResponse, SearchAdapterError> {
        let mut state = self.state();
        state.calls.create_index += 1;
        state.take_failure()?;

        if state.indices.contains_key(index) {
            return Err(engine_error(
                400,
                "resource_already_exists_exception",
                &format!("index [{}] already exists", index),
            ));
        }
        state
            .indices
            .insert(index.to_string(), StoredIndex::new(body));

        Ok(AcknowledgedResponse {
            acknowledged: true,
            shards_acknowledged: Some(true),
            index: Some(index.to_string()),
        })
    }

    async fn get_index(&self, index: &str) -> Result<Value, SearchAdapterError> {
        let mut state = self.state();
        state.calls.get_index += 1;
        state.take_failure()?;

        let stored = state.index(index)?;
        Ok(json!({
            index: {
                "aliases": {},
                "mappings": stored.mappings,
                "settings": stored.settings,
            }
        }))
    }

    async fn delete_index(&self, index: &str) -> Result<AcknowledgedResponse, SearchAdapterError> {
        let mut state = self.state();
        state.calls.delete_index += 1;
        state.take_failure()?;

        state
            .indices
            .remove(index)
            .ok_or_else(|| index_not_found(index))?;
        Ok(AcknowledgedResponse::acknowledged())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchAdapterError> {
        let mut state = self.state();
        state.calls.index_exists += 1;
        state.take_failure()?;

        Ok(state.indices.contains_key(index))
    }

    async fn get_mapping(&self, index: &str) -> Result<Value, SearchAdapterError> {
        let mut state = self.state();
        state.calls.get_mapping += 1;
        state.take_failure()?;

        let stored = state.index(index)?;
        Ok(json!({ index: { "mappings": stored.mappings } }))
    }

    async fn put_mapping(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<AcknowledgedResponse, SearchAdapterError> {
        let mut state = self.state();
        state.calls.put_mapping += 1;
        state.take_failure()?;

        let properties = body
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| {
                engine_error(
                    400,
                    "mapper_parsing_exception",
                    "mapping body must contain properties",
                )
            })?;

        let stored = state.index_mut(index)?;
        if !stored.mappings.is_object() {
            stored.mappings = Value::Object(Map::new());
        }
        let mappings = stored
            .mappings
            .as_object_mut()
            .ok_or_else(|| SearchAdapterError::parse("stored mappings are not an object"))?;
        let existing = mappings
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(existing) = existing.as_object_mut() {
            existing.extend(properties);
        }

        Ok(AcknowledgedResponse::acknowledged())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
        refresh: RefreshPolicy,
    ) -> Result<WriteResponse, SearchAdapterError> {
        let mut state = self.state();
        state.calls.index_document += 1;
        state.refresh_policies.push(refresh);
        state.take_failure()?;

        let upsert = state.upsert(index, id, body.clone());
        Ok(WriteResponse {
            index: index.to_string(),
            id: id.to_string(),
            version: Some(upsert.version),
            result: result_name(&upsert).to_string(),
            seq_no: Some(upsert.seq_no),
            primary_term: Some(PRIMARY_TERM),
        })
    }

    async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<GetResponse<Value>, SearchAdapterError> {
        let mut state = self.state();
        state.calls.get_document += 1;
        state.take_failure()?;

        let doc = state
            .indices
            .get(index)
            .and_then(|i| i.documents.get(id))
            .ok_or_else(|| SearchAdapterError::document_not_found(index, id))?;

        Ok(GetResponse {
            index: index.to_string(),
            id: id.to_string(),
            found: true,
            version: Some(doc.version),
            seq_no: Some(doc.seq_no),
            primary_term: Some(PRIMARY_TERM),
            source: Some(doc.source.clone()),
        })
    }

    async fn delete_document(
        &self,
        index: &str,
        id: &str,
        refresh: RefreshPolicy,
    ) -> Result<WriteResponse, SearchAdapterError> {
        let mut state = self.state();
        state.calls.delete_document += 1;
        state.refresh_policies.push(refresh);
        state.take_failure()?;

        let doc = state
            .remove(index, id)
            .ok_or_else(|| SearchAdapterError::document_not_found(index, id))?;
        state.next_seq_no += 1;

        Ok(WriteResponse {
            index: index.to_string(),
            id: id.to_string(),
            version: Some(doc.version + 1),
            result: "deleted".to_string(),
            seq_no: Some(state.next_seq_no),
            primary_term: Some(PRIMARY_TERM),
        })
    }

    async fn bulk(
        &self,
        lines: &[BulkLine],
        refresh: RefreshPolicy,
    ) -> Result<BulkResponse, SearchAdapterError> {
        let started = Instant::now();
        let mut state = self.state();
        state.calls.bulk += 1;
        state.refresh_policies.push(refresh);

        let wire = lines
            .iter()
            .map(BulkLine::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        state.bulk_requests.push(wire);
        state.take_failure()?;

        if lines.is_empty() {
            return Err(malformed_bulk("request body is required"));
        }
        let pairs = pair_lines(lines)?;

        let items: Vec<BulkItemResult> = pairs
            .into_iter()
            .map(|(action, source)| BulkItemResult {
                action: action.kind,
                status: state.apply_bulk_item(action, source),
            })
            .collect();
        let errors = items.iter().any(|item| item.status.error.is_some());

        Ok(BulkResponse {
            took: started.elapsed().as_millis() as u64,
            errors,
            items,
        })
    }

    async fn mget(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<MultiGetResponse<Value>, SearchAdapterError> {
        let mut state = self.state();
        state.calls.mget += 1;
        state.take_failure()?;

        let stored = state.indices.get(index);
        let docs = ids
            .iter()
            .map(|id| {
                let Some(stored) = stored else {
                    return MultiGetDoc {
                        index: index.to_string(),
                        id: id.clone(),
                        found: false,
                        version: None,
                        source: None,
                        error: Some(json!({
                            "type": "index_not_found_exception",
                            "reason": format!("no such index [{}]", index),
                        })),
                    };
                };
                match stored.documents.get(id) {
                    Some(doc) => MultiGetDoc {
                        index: index.to_string(),
                        id: id.clone(),
                        found: true,
                        version: Some(doc.version),
                        source: Some(doc.source.clone()),
                        error: None,
                    },
                    None => MultiGetDoc {
                        index: index.to_string(),
                        id: id.clone(),
                        found: false,
                        version: None,
                        source: None,
                        error: None,
                    },
                }
            })
            .collect();

        Ok(MultiGetResponse { docs })
    }

    async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResponse<Value>, SearchAdapterError> {
        let started = Instant::now();
        let mut state = self.state();
        state.calls.search += 1;
        state.take_failure()?;

        let stored = state.index(&request.index)?;
        let body = &request.body;
        let sort = SortKey::parse(body.get("sort"))?;
        let size = request
            .size
            .or_else(|| body.get("size").and_then(Value::as_u64))
            .unwrap_or(DEFAULT_PAGE_SIZE) as usize;
        let from = request
            .from
            .or_else(|| body.get("from").and_then(Value::as_u64))
            .unwrap_or(0) as usize;

        let mut matched = Vec::new();
        for (id, doc) in &stored.documents {
            if query::matches(body.get("query"), id, &doc.source)? {
                matched.push((id, doc));
            }
        }
        matched.sort_by_key(|(_, doc)| doc.seq_no);
        if let Some(sort) = &sort {
            matched.sort_by(|(_, a), (_, b)| sort.cmp(&a.source, &b.source));
        }

        let score = if sort.is_some() { None } else { Some(1.0) };
        let total = matched.len() as u64;
        let hits: Vec<SearchHit<Value>> = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(id, doc)| SearchHit {
                index: request.index.clone(),
                id: id.clone(),
                score,
                source: Some(doc.source.clone()),
            })
            .collect();
        let max_score = if hits.is_empty() { None } else { score };

        Ok(SearchResponse {
            took: started.elapsed().as_millis() as u64,
            timed_out: false,
            hits: SearchHits {
                total: Some(TotalHits::Detailed {
                    value: total,
                    relation: Some("eq".to_string()),
                }),
                max_score,
                hits,
            },
        })
    }
}
