//! Search request handling

use crate::engine::SearchEngine;
use crate::error::{AppError, Result};
use crate::metrics::{SEARCH_DURATION_SECONDS, SEARCH_REQUESTS_TOTAL};
use crate::search::query::{validate_index_name, QueryBody, QueryBuilder, QueryParameters};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use validator::Validate;

/// Reshaped search results
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Query body sent to the engine
    pub query: QueryBody,

    /// `_source` of every hit, in engine order
    pub items: Vec<Value>,

    /// Total hit count reported by the engine
    pub total: u64,

    /// Offset used for this page
    pub start: u64,
}

/// What a search request produced.
///
/// Serialized untagged: callers tell the shapes apart by `items`, `error`
/// or whatever the engine sent.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchOutcome {
    /// Regular results
    Reshaped(SearchResponse),

    /// Engine response reporting an error or lacking hits, unchanged
    Passthrough(Value),

    /// The engine call itself failed
    Error { error: String },
}

impl SearchOutcome {
    fn label(&self) -> &'static str {
        match self {
            SearchOutcome::Reshaped(_) => "reshaped",
            SearchOutcome::Passthrough(_) => "passthrough",
            SearchOutcome::Error { .. } => "error",
        }
    }
}

/// Runs searches and status lookups against the engine
#[derive(Clone)]
pub struct SearchService {
    engine: Arc<dyn SearchEngine>,
    default_index: String,
}

impl SearchService {
    pub fn new(engine: Arc<dyn SearchEngine>, default_index: impl Into<String>) -> Self {
        Self {
            engine,
            default_index: default_index.into(),
        }
    }

    /// Index used when a request does not name one
    pub fn default_index(&self) -> &str {
        &self.default_index
    }

    /// Search with `params`.
    ///
    /// Only invalid parameters are returned as `Err`; engine failures are
    /// reported through [`SearchOutcome::Error`].
    pub async fn search(&self, params: &QueryParameters) -> Result<SearchOutcome> {
        params.validate()?;

        let start = params.start_or_default();
        let index = params.api.as_deref().unwrap_or(&self.default_index);
        let body = QueryBuilder::build(params);

        debug!(index, start, query = %body.to_json(), "Executing search");
        let timer = SEARCH_DURATION_SECONDS.start_timer();
        let result = self.engine.search(index, &body.to_json(), start).await;
        timer.observe_duration();

        let outcome = match result {
            Ok(raw) => reshape(raw, body, start),
            Err(e) => {
                warn!(index, error = %e, "Search failed");
                SearchOutcome::Error {
                    error: e.to_string(),
                }
            }
        };

        SEARCH_REQUESTS_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();
        Ok(outcome)
    }

    /// Engine statistics (`total` section) for `index`, or the default index
    pub async fn index_status(&self, index: Option<&str>) -> Result<Value> {
        let index = index.unwrap_or(&self.default_index);
        validate_index_name(index)
            .map_err(|_| AppError::Validation(format!("'{}' is not a valid index name", index)))?;

        let mut stats = self.engine.index_stats(index).await?;
        stats
            .get_mut("indices")
            .and_then(|indices| indices.get_mut(index))
            .and_then(|entry| entry.get_mut("total"))
            .map(Value::take)
            .ok_or_else(|| AppError::NotFound(format!("No statistics for index '{}'", index)))
    }
}

fn reshape(raw: Value, query: QueryBody, start: u64) -> SearchOutcome {
    if raw.get("error").is_some() {
        return SearchOutcome::Passthrough(raw);
    }

    let mut raw = match raw {
        Value::Object(raw) => raw,
        other => return SearchOutcome::Passthrough(other),
    };
    let Some(mut hits) = raw.remove("hits") else {
        return SearchOutcome::Passthrough(Value::Object(raw));
    };

    let total = total_hits(hits.get("total"));
    let items = match hits.get_mut("hits").map(Value::take) {
        Some(Value::Array(hits)) => hits
            .into_iter()
            .map(|mut hit| hit.get_mut("_source").map(Value::take).unwrap_or(Value::Null))
            .collect(),
        _ => Vec::new(),
    };

    SearchOutcome::Reshaped(SearchResponse {
        query,
        items,
        total,
        start,
    })
}

/// Hit count, whether reported as a number or as `{"value": n, ...}`
fn total_hits(total: Option<&Value>) -> u64 {
    match total {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::Object(obj)) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}
