use crate::engine::error::{EngineError, EngineResult};
use crate::engine::{SearchEngine, TENDER_DOC_TYPE};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Hits returned per page when the query does not set `size`
const DEFAULT_PAGE_SIZE: usize = 10;

/// One call received by [`InMemoryEngine`], in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    IndexExists(String),
    CreateIndex(String),
    DeleteIndex(String),
    IndexDocument { index: String, doc_type: String },
    Search { index: String, from: u64 },
    IndexStats(String),
}

#[derive(Debug, Clone)]
struct StoredIndex {
    mapping: Value,
    documents: Vec<(String, Value)>,
}

/// In-memory engine for tests
///
/// Evaluates the query shapes this crate builds (`match_all`, `match`,
/// `term`, `terms`, `bool.must`) and answers like the REST engine does,
/// including JSON error bodies for unknown indices and unsupported queries.
#[derive(Clone, Default)]
pub struct InMemoryEngine {
    indices: Arc<DashMap<String, StoredIndex>>,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing, empty index
    pub fn with_index(self, index: &str) -> Self {
        self.indices.insert(
            index.to_string(),
            StoredIndex {
                mapping: json!({}),
                documents: Vec::new(),
            },
        );
        self
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Number of document submissions received
    pub fn submission_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, EngineCall::IndexDocument { .. }))
            .count()
    }

    /// Documents stored in `index`, in submission order
    pub fn documents(&self, index: &str) -> Vec<Value> {
        self.indices
            .get(index)
            .map(|entry| entry.documents.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default()
    }

    /// Mapping body the index was created with
    pub fn mapping(&self, index: &str) -> Option<Value> {
        self.indices.get(index).map(|entry| entry.mapping.clone())
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    async fn index_exists(&self, index: &str) -> EngineResult<bool> {
        self.record(EngineCall::IndexExists(index.to_string()));
        Ok(self.indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, body: &Value) -> EngineResult<()> {
        self.record(EngineCall::CreateIndex(index.to_string()));
        if self.indices.contains_key(index) {
            return Err(EngineError::Status {
                status: 400,
                body: error_body("resource_already_exists_exception", index, 400).to_string(),
            });
        }

        self.indices.insert(
            index.to_string(),
            StoredIndex {
                mapping: body.clone(),
                documents: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> EngineResult<()> {
        self.record(EngineCall::DeleteIndex(index.to_string()));
        match self.indices.remove(index) {
            Some(_) => Ok(()),
            None => Err(index_not_found(index)),
        }
    }

    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        document: &Value,
    ) -> EngineResult<()> {
        self.record(EngineCall::IndexDocument {
            index: index.to_string(),
            doc_type: doc_type.to_string(),
        });

        // Like the REST engine, indexing into a missing index creates it
        self.indices
            .entry(index.to_string())
            .or_insert_with(|| StoredIndex {
                mapping: json!({}),
                documents: Vec::new(),
            })
            .documents
            .push((Uuid::new_v4().to_string(), document.clone()));
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value, from: u64) -> EngineResult<Value> {
        self.record(EngineCall::Search {
            index: index.to_string(),
            from,
        });

        let Some(stored) = self.indices.get(index) else {
            return Ok(error_body("index_not_found_exception", index, 404));
        };

        let query = body.get("query").cloned().unwrap_or_else(|| json!({"match_all": {}}));
        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map(|s| s as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let mut matched = Vec::new();
        for (id, doc) in &stored.documents {
            match matches_clause(&query, doc) {
                Ok(true) => matched.push((id, doc)),
                Ok(false) => {}
                Err(reason) => return Ok(error_body("parsing_exception", &reason, 400)),
            }
        }

        let total = matched.len();
        let hits: Vec<Value> = matched
            .into_iter()
            .skip(from as usize)
            .take(size)
            .map(|(id, doc)| {
                json!({
                    "_index": index,
                    "_type": TENDER_DOC_TYPE,
                    "_id": id,
                    "_score": 1.0,
                    "_source": doc,
                })
            })
            .collect();

        Ok(json!({
            "took": 0,
            "timed_out": false,
            "hits": {
                "total": total,
                "max_score": 1.0,
                "hits": hits,
            }
        }))
    }

    async fn index_stats(&self, index: &str) -> EngineResult<Value> {
        self.record(EngineCall::IndexStats(index.to_string()));
        let Some(stored) = self.indices.get(index) else {
            return Err(index_not_found(index));
        };

        let docs = json!({"docs": {"count": stored.documents.len(), "deleted": 0}});
        Ok(json!({
            "_all": {"primaries": docs, "total": docs},
            "indices": {
                index: {"primaries": docs, "total": docs}
            }
        }))
    }
}

fn error_body(kind: &str, reason: &str, status: u16) -> Value {
    json!({
        "error": {"type": kind, "reason": reason},
        "status": status,
    })
}

fn index_not_found(index: &str) -> EngineError {
    EngineError::Status {
        status: 404,
        body: error_body("index_not_found_exception", index, 404).to_string(),
    }
}

/// Evaluate one query clause against a document
fn matches_clause(clause: &Value, doc: &Value) -> Result<bool, String> {
    let Some((kind, spec)) = clause.as_object().and_then(|obj| obj.iter().next()) else {
        return Err(format!("malformed query clause: {}", clause));
    };

    match kind.as_str() {
        "match_all" => Ok(true),
        "match" => {
            let (field, params) = single_entry(spec)?;
            let (text, operator) = match params {
                Value::String(text) => (text.as_str(), None),
                Value::Object(obj) => (
                    obj.get("query").and_then(Value::as_str).unwrap_or_default(),
                    obj.get("operator").and_then(Value::as_str),
                ),
                other => return Err(format!("unsupported match value: {}", other)),
            };

            let haystack = words(&field_text(doc, field));
            let mut terms = text.split_whitespace().map(str::to_lowercase);
            if operator.map(|op| op.eq_ignore_ascii_case("and")).unwrap_or(false) {
                Ok(terms.all(|term| haystack.contains(&term)))
            } else {
                Ok(terms.any(|term| haystack.contains(&term)))
            }
        }
        "term" => {
            let (field, value) = single_entry(spec)?;
            let expected = scalar_text(value).ok_or_else(|| format!("unsupported term value: {}", value))?;
            Ok(field_values(doc, field).iter().any(|v| *v == expected))
        }
        "terms" => {
            let (field, values) = single_entry(spec)?;
            let expected: Vec<String> = values
                .as_array()
                .ok_or_else(|| format!("terms on [{}] requires an array", field))?
                .iter()
                .filter_map(scalar_text)
                .collect();
            Ok(field_values(doc, field).iter().any(|v| expected.contains(v)))
        }
        "bool" => {
            let must = spec.get("must").cloned().unwrap_or_else(|| json!([]));
            let clauses = match must {
                Value::Array(items) => items,
                single => vec![single],
            };
            for clause in &clauses {
                if !matches_clause(clause, doc)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Err(format!("unknown query [{}]", other)),
    }
}

fn single_entry(spec: &Value) -> Result<(&str, &Value), String> {
    spec.as_object()
        .and_then(|obj| obj.iter().next())
        .map(|(field, value)| (field.as_str(), value))
        .ok_or_else(|| format!("expected a single field, got {}", spec))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Scalar values found at a dotted field path
fn field_values(doc: &Value, path: &str) -> Vec<String> {
    let mut current = vec![doc];
    for part in path.split('.') {
        current = current
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .filter_map(|value| value.get(part))
            .collect();
    }

    let mut out = Vec::new();
    for value in current {
        collect_scalars(value, &mut out);
    }
    out
}

/// Text searched by a `match` clause; `_all` covers the whole document
fn field_text(doc: &Value, field: &str) -> String {
    let mut out = Vec::new();
    if field == "_all" {
        collect_scalars(doc, &mut out);
    } else {
        out = field_values(doc, field);
    }
    out.join(" ")
}

fn collect_scalars(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_scalars(item, out)),
        Value::Object(obj) => obj.values().for_each(|item| collect_scalars(item, out)),
        other => out.extend(scalar_text(other)),
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
