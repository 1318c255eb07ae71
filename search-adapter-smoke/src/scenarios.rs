//! End-to-end scenarios run against a live engine.
//!
//! Each scenario works in its own freshly named index and deletes it when
//! done, whether or not its checks passed.

use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use search_adapter::{
    BatchGetRequest, BatchOperation, BatchWriteRequest, CreateIndexRequest,
    DeleteDocumentRequest, GetDocumentRequest, IndexDocumentRequest, RefreshPolicy,
    ReplaceDocumentRequest, SearchAdapter, SearchRequest, UpdateMappingRequest,
};

use crate::errors::{ensure, SmokeError};
use crate::fixtures::{self, User};

const USER_COUNT: usize = 20;
const PAGE_SIZE: u64 = 10;

/// The scenarios, in the order they run.
pub const SCENARIOS: [&str; 6] = ["indexes", "crud", "batch", "search", "pagination", "catalog"];

/// Index name for one scenario run: `{prefix}-{scenario}-{random suffix}`.
pub fn index_name(prefix: &str, scenario: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, scenario, &suffix[..8])
}

/// Run `scenario` in a fresh index, then delete the index.
pub async fn run(adapter: &SearchAdapter, prefix: &str, scenario: &str) -> Result<(), SmokeError> {
    let index = index_name(prefix, scenario);
    info!(scenario, index = %index, "Running scenario");

    let result = match scenario {
        "indexes" => indexes(adapter, &index).await,
        "crud" => crud(adapter, &index).await,
        "batch" => batch(adapter, &index).await,
        "search" => search(adapter, &index).await,
        "pagination" => pagination(adapter, &index).await,
        "catalog" => catalog(adapter, &index).await,
        other => Err(SmokeError::check(format!("unknown scenario '{}'", other))),
    };

    if adapter.exists_index(&index).await.unwrap_or(false) {
        if let Err(e) = adapter.delete_index(&index).await {
            warn!(index = %index, error = %e, "Failed to clean up scenario index");
        }
    }

    result
}

async fn indexes(adapter: &SearchAdapter, index: &str) -> Result<(), SmokeError> {
    ensure(!adapter.exists_index(index).await?, "index exists before creation")?;

    let created = adapter
        .create_index(&CreateIndexRequest::new(index).with_body(json!({
            "settings": {"number_of_shards": 1, "number_of_replicas": 0},
            "mappings": {"properties": {"title": {"type": "text"}}}
        })))
        .await?;
    ensure(created.acknowledged, "index creation was not acknowledged")?;
    ensure(adapter.exists_index(index).await?, "index missing after creation")?;

    let description = adapter.get_index(index).await?;
    ensure(
        description.get(index).is_some(),
        "index description is not keyed by index name",
    )?;

    adapter
        .update_mapping(&UpdateMappingRequest::new(
            index,
            json!({"properties": {"tags": {"type": "keyword"}}}),
        ))
        .await?;
    let mapping = adapter.get_mapping(index).await?;
    let properties = &mapping[index]["mappings"]["properties"];
    ensure(properties["title"]["type"] == "text", "title mapping was lost")?;
    ensure(properties["tags"]["type"] == "keyword", "tags mapping was not added")?;

    adapter.delete_index(index).await?;
    ensure(!adapter.exists_index(index).await?, "index exists after deletion")
}

async fn crud(adapter: &SearchAdapter, index: &str) -> Result<(), SmokeError> {
    let generated = adapter
        .index_document(
            &IndexDocumentRequest::new(index, json!({"title": "Untitled"}))
                .with_refresh(RefreshPolicy::Immediate),
        )
        .await?;
    ensure(!generated.id.is_empty(), "no id was synthesized")?;

    adapter
        .index_document(
            &IndexDocumentRequest::new(index, json!({"title": "A"})).with_id("D1"),
        )
        .await?;
    let fetched = adapter
        .get_document::<Value>(&GetDocumentRequest::new(index, "D1"))
        .await?;
    ensure(
        fetched.source == Some(json!({"title": "A"})),
        "fetched document differs from indexed one",
    )?;

    adapter
        .index_document(
            &IndexDocumentRequest::new(index, json!({"title": "B"})).with_id("D1"),
        )
        .await?;
    let fetched = adapter
        .get_document::<Value>(&GetDocumentRequest::new(index, "D1"))
        .await?;
    ensure(
        fetched.source == Some(json!({"title": "B"})),
        "second index did not overwrite",
    )?;

    let replaced = adapter
        .replace_document(&ReplaceDocumentRequest::new(
            index,
            "D1",
            json!({"title": "C", "tags": ["replaced"]}),
        ))
        .await?;
    ensure(replaced.result == "updated", "replace did not update")?;

    adapter
        .delete_document(
            &DeleteDocumentRequest::new(index, "D1").with_refresh(RefreshPolicy::Immediate),
        )
        .await?;
    match adapter
        .get_document::<Value>(&GetDocumentRequest::new(index, "D1"))
        .await
    {
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e.into()),
        Ok(_) => Err(SmokeError::check("document still present after delete")),
    }
}

async fn batch(adapter: &SearchAdapter, index: &str) -> Result<(), SmokeError> {
    let empty = adapter
        .batch_write(&BatchWriteRequest::<Value>::new(Vec::new()))
        .await?;
    ensure(!empty.errors && empty.items.is_empty(), "empty batch was not a no-op")?;

    let write = adapter
        .batch_write(
            &BatchWriteRequest::new(vec![
                BatchOperation::index(index, json!({"title": "A"})).with_id("A"),
                BatchOperation::create(index, json!({"title": "B"})).with_id("B"),
                BatchOperation::index(index, json!({"title": "Generated"})),
                BatchOperation::update(index, "A", json!({"doc": {"year": 2001}})),
                BatchOperation::index(index, json!({"title": "Gone"})).with_id("C"),
                BatchOperation::delete(index, "C"),
            ])
            .with_refresh(RefreshPolicy::WaitFor),
        )
        .await?;
    ensure(!write.errors, format!("batch reported item errors: {:?}", write.items))?;
    ensure(write.items.len() == 6, "batch returned the wrong number of items")?;

    let read = adapter
        .batch_get::<Value>(&BatchGetRequest::new(index, ["A", "B", "C", "Z"]))
        .await?;
    let found: Vec<bool> = read.docs.iter().map(|d| d.found).collect();
    ensure(
        found == vec![true, true, false, false],
        format!("unexpected found flags {:?}", found),
    )?;
    ensure(
        read.docs[0].source == Some(json!({"title": "A", "year": 2001})),
        "update did not merge into A",
    )?;

    let conflict = adapter
        .batch_write(&BatchWriteRequest::new(vec![BatchOperation::create(
            index,
            json!({"title": "B again"}),
        )
        .with_id("B")]))
        .await?;
    ensure(
        conflict.errors && !conflict.items[0].is_success(),
        "duplicate create was not rejected",
    )
}

async fn load_users(adapter: &SearchAdapter, index: &str, count: usize) -> Result<(), SmokeError> {
    let operations: Vec<BatchOperation<User>> = fixtures::generate_users(count)
        .into_iter()
        .map(|user| {
            let id = user.id.clone();
            BatchOperation::index(index, user).with_id(id)
        })
        .collect();

    let response = adapter
        .batch_write(&BatchWriteRequest::new(operations).with_refresh(RefreshPolicy::Immediate))
        .await?;
    ensure(!response.errors, "loading users reported item errors")
}

/// Total hits of `query`. Sources stay untyped so any document shape counts.
async fn count(adapter: &SearchAdapter, index: &str, query: Value) -> Result<u64, SmokeError> {
    let response = adapter
        .search::<Value>(&SearchRequest::new(index, json!({ "query": query })))
        .await?;
    Ok(response.total())
}

async fn search(adapter: &SearchAdapter, index: &str) -> Result<(), SmokeError> {
    load_users(adapter, index, USER_COUNT).await?;

    let checks = [
        (json!({"match_all": {}}), fixtures::expected_users(USER_COUNT, None, 0)),
        (
            json!({"term": {"department.keyword": "Engineering"}}),
            fixtures::expected_users(USER_COUNT, Some("Engineering"), 0),
        ),
        (
            json!({"range": {"salary": {"gt": 70000}}}),
            fixtures::expected_users(USER_COUNT, None, 70_000),
        ),
        (
            json!({"bool": {"must": [
                {"term": {"department.keyword": "Sales"}},
                {"range": {"salary": {"gt": 70000}}}
            ]}}),
            fixtures::expected_users(USER_COUNT, Some("Sales"), 70_000),
        ),
    ];

    for (query, expected) in checks {
        let total = count(adapter, index, query.clone()).await?;
        ensure(
            total == expected,
            format!("query {} matched {} documents, expected {}", query, total, expected),
        )?;
    }
    Ok(())
}

async fn pagination(adapter: &SearchAdapter, index: &str) -> Result<(), SmokeError> {
    let total_users = 25;
    load_users(adapter, index, total_users).await?;

    let mut seen = Vec::new();
    let mut from = 0;
    loop {
        let page = adapter
            .search::<User>(
                &SearchRequest::new(
                    index,
                    json!({"query": {"match_all": {}}, "sort": [{"id.keyword": "asc"}]}),
                )
                .with_size(PAGE_SIZE)
                .with_from(from),
            )
            .await?;
        if page.hits.hits.is_empty() {
            break;
        }
        seen.extend(page.hits.hits.into_iter().map(|h| h.id));
        from += PAGE_SIZE;
    }

    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    ensure(
        seen.len() == total_users && unique.len() == total_users,
        format!("paged through {} hits ({} distinct)", seen.len(), unique.len()),
    )
}

async fn catalog(adapter: &SearchAdapter, index: &str) -> Result<(), SmokeError> {
    let operations = fixtures::catalog()
        .into_iter()
        .map(|(id, body)| BatchOperation::index(index, body).with_id(id))
        .collect();
    adapter
        .batch_write(&BatchWriteRequest::new(operations).with_refresh(RefreshPolicy::Immediate))
        .await?;

    let books = count(adapter, index, json!({"term": {"type.keyword": "book"}})).await?;
    ensure(books == 2, format!("found {} books, expected 2", books))?;

    let fantasy = count(
        adapter,
        index,
        json!({"multi_match": {"query": "Fantasy", "fields": ["name", "title"]}}),
    )
    .await?;
    ensure(fantasy == 2, format!("found {} fantasy matches, expected 2", fantasy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_adapter::{AdapterContext, InMemoryTransport};
    use std::sync::Arc;

    fn adapter() -> SearchAdapter {
        SearchAdapter::new(AdapterContext::new(Arc::new(InMemoryTransport::new())))
    }

    #[test]
    fn test_index_name() {
        let name = index_name("smoke", "crud");
        assert!(name.starts_with("smoke-crud-"));
        assert_eq!(name.len(), "smoke-crud-".len() + 8);
        assert_ne!(name, index_name("smoke", "crud"));
    }

    #[tokio::test]
    async fn test_every_scenario_passes_in_memory() {
        let adapter = adapter();
        for scenario in SCENARIOS {
            run(&adapter, "smoke", scenario)
                .await
                .unwrap_or_else(|e| panic!("scenario {} failed: {}", scenario, e));
        }
    }

    #[tokio::test]
    async fn test_catalog_counts_mixed_document_types() {
        let adapter = adapter();
        let index = index_name("smoke", "catalog");

        catalog(&adapter, &index).await.unwrap();

        let everything = count(&adapter, &index, json!({"match_all": {}})).await.unwrap();
        assert_eq!(everything, fixtures::catalog().len() as u64);
    }

    #[tokio::test]
    async fn test_unknown_scenario_fails() {
        let err = run(&adapter(), "smoke", "nope").await.unwrap_err();
        assert!(matches!(err, SmokeError::CheckFailed(_)));
    }
}
