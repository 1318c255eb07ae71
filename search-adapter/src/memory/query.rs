//! Query DSL evaluation for the in-memory transport.
//!
//! Covers the subset of the DSL the adapter's own tests and the smoke
//! scenarios use: `match_all`, `term`, `match`, `multi_match`, `range`, `ids`
//! and `bool`, plus single-field `sort`. A `.keyword` suffix on a field is
//! treated as the exact value of the base field.

use std::cmp::Ordering;

use serde_json::Value;

use crate::errors::SearchAdapterError;

fn unsupported(what: &str) -> SearchAdapterError {
    SearchAdapterError::engine(
        400,
        format!("in-memory transport does not support {}", what),
    )
}

/// Look up a dotted field path, ignoring a trailing `.keyword`.
fn field<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_suffix(".keyword").unwrap_or(path);
    path.split('.').try_fold(source, |value, key| value.get(key))
}

/// Exact comparison, where an array field matches if any element matches.
fn term_matches(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        Some(Value::Array(items)) => items.iter().any(|item| item == expected),
        Some(value) => value == expected,
        None => false,
    }
}

/// Full-text approximation: any query token appears in the field's text.
fn text_matches(value: Option<&Value>, query: &Value) -> bool {
    let Some(value) = value else {
        return false;
    };
    match (value, query) {
        (Value::String(text), Value::String(query)) => {
            let text = text.to_lowercase();
            query
                .split_whitespace()
                .any(|token| text.contains(&token.to_lowercase()))
        }
        (Value::Array(items), query) => items.iter().any(|item| text_matches(Some(item), query)),
        (value, query) => value == query,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn range_matches(value: Option<&Value>, bounds: &Value) -> Result<bool, SearchAdapterError> {
    let bounds = bounds
        .as_object()
        .ok_or_else(|| unsupported("a range without bounds"))?;
    let Some(value) = value else {
        return Ok(false);
    };

    for (op, bound) in bounds {
        let ordering = compare(value, bound);
        let ok = match op.as_str() {
            "gt" => ordering == Some(Ordering::Greater),
            "gte" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            "lt" => ordering == Some(Ordering::Less),
            "lte" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            "format" | "boost" => true,
            other => return Err(unsupported(&format!("range operator '{}'", other))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The single `{field: value}` entry of a leaf query.
fn single_entry<'a>(clause: &'a Value, kind: &str) -> Result<(&'a str, &'a Value), SearchAdapterError> {
    clause
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.iter().next())
        .map(|(k, v)| (k.as_str(), v))
        .ok_or_else(|| unsupported(&format!("a {} query without exactly one field", kind)))
}

/// Clauses of a `bool` section, which may be a single object or an array.
fn clauses(section: Option<&Value>) -> Vec<&Value> {
    match section {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
        None => Vec::new(),
    }
}

/// Evaluate a query against one document. `None` matches everything.
pub(crate) fn matches(query: Option<&Value>, id: &str, source: &Value) -> Result<bool, SearchAdapterError> {
    let Some(query) = query else {
        return Ok(true);
    };
    let (kind, clause) = single_entry(query, "top-level")?;

    match kind {
        "match_all" => Ok(true),
        "term" => {
            let (path, expected) = single_entry(clause, "term")?;
            let expected = expected.get("value").unwrap_or(expected);
            Ok(term_matches(field(source, path), expected))
        }
        "terms" => {
            let (path, options) = single_entry(clause, "terms")?;
            let options = options
                .as_array()
                .ok_or_else(|| unsupported("terms without an array"))?;
            let value = field(source, path);
            Ok(options.iter().any(|expected| term_matches(value, expected)))
        }
        "match" => {
            let (path, text) = single_entry(clause, "match")?;
            let text = text.get("query").unwrap_or(text);
            Ok(text_matches(field(source, path), text))
        }
        "multi_match" => {
            let text = clause
                .get("query")
                .ok_or_else(|| unsupported("multi_match without a query"))?;
            let fields = clause
                .get("fields")
                .and_then(Value::as_array)
                .ok_or_else(|| unsupported("multi_match without fields"))?;
            Ok(fields.iter().filter_map(Value::as_str).any(|path| {
                // strip boosts such as "name^2"
                let path = path.split('^').next().unwrap_or(path);
                text_matches(field(source, path), text)
            }))
        }
        "range" => {
            let (path, bounds) = single_entry(clause, "range")?;
            range_matches(field(source, path), bounds)
        }
        "ids" => {
            let values = clause
                .get("values")
                .and_then(Value::as_array)
                .ok_or_else(|| unsupported("ids without values"))?;
            Ok(values.iter().any(|v| v.as_str() == Some(id)))
        }
        "bool" => {
            for must in clauses(clause.get("must"))
                .into_iter()
                .chain(clauses(clause.get("filter")))
            {
                if !matches(Some(must), id, source)? {
                    return Ok(false);
                }
            }
            for must_not in clauses(clause.get("must_not")) {
                if matches(Some(must_not), id, source)? {
                    return Ok(false);
                }
            }
            let should = clauses(clause.get("should"));
            if should.is_empty() {
                return Ok(true);
            }
            for candidate in should {
                if matches(Some(candidate), id, source)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        other => Err(unsupported(&format!("'{}' queries", other))),
    }
}

/// A parsed single-field sort.
pub(crate) struct SortKey {
    field: String,
    descending: bool,
}

impl SortKey {
    /// Parse the first entry of a `sort` array. Returns `None` when absent.
    pub(crate) fn parse(sort: Option<&Value>) -> Result<Option<Self>, SearchAdapterError> {
        let entry = match sort {
            None => return Ok(None),
            Some(Value::Array(items)) => match items.first() {
                Some(entry) => entry,
                None => return Ok(None),
            },
            Some(entry) => entry,
        };

        if let Some(field) = entry.as_str() {
            return Ok(Some(Self {
                field: field.to_string(),
                descending: false,
            }));
        }

        let (field, order) = single_entry(entry, "sort")?;
        let order = order.get("order").unwrap_or(order);
        let descending = match order.as_str() {
            Some("asc") => false,
            Some("desc") => true,
            _ => return Err(unsupported("a sort order other than asc or desc")),
        };
        Ok(Some(Self {
            field: field.to_string(),
            descending,
        }))
    }

    /// Order two documents; documents missing the field sort last.
    pub(crate) fn cmp(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = match (field(a, &self.field), field(b, &self.field)) {
            (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}
