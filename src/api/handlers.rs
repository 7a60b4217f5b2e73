use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::search::{QueryParameters, SearchOutcome};
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub api: Option<String>,
}

/// Document statistics of the selected index
pub async fn index_status(
    State(state): State<AppState>,
    Query(params): Query<StatusQuery>,
) -> Result<Json<Value>> {
    let stats = state.search.index_status(params.api.as_deref()).await?;
    Ok(Json(stats))
}

/// Search with parameters from the query string
pub async fn search_get(
    State(state): State<AppState>,
    pairs: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<SearchOutcome>> {
    let Query(pairs) = pairs.map_err(|e| AppError::Validation(e.body_text()))?;
    let params = parse_query_pairs(pairs)?;
    let outcome = state.search.search(&params).await?;
    Ok(Json(outcome))
}

/// Search with parameters from a JSON body; an empty body searches everything
pub async fn search_post(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SearchOutcome>> {
    let params = parse_body(&body)?;
    let outcome = state.search.search(&params).await?;
    Ok(Json(outcome))
}

/// Parameters from query-string pairs; a repeated key keeps its first value
fn parse_query_pairs(pairs: Vec<(String, String)>) -> Result<QueryParameters> {
    let mut fields = Map::new();
    for (key, value) in pairs {
        fields.entry(key).or_insert(Value::String(value));
    }
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::Validation(format!("Invalid search parameters: {}", e)))
}

fn parse_body(body: &[u8]) -> Result<QueryParameters> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(QueryParameters::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid search parameters: {}", e)))
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    let metrics = crate::metrics::gather_metrics();
    (StatusCode::OK, metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_repeated_query_key_keeps_first_value() {
        let params =
            parse_query_pairs(pairs(&[("status", "active"), ("status", "closed")])).unwrap();
        assert_eq!(params.status.unwrap().values(), vec!["active"]);
    }

    #[test]
    fn test_query_pairs_parse_start_and_ignore_unknown_keys() {
        let params = parse_query_pairs(pairs(&[("start", "10"), ("foo", "bar")])).unwrap();
        assert_eq!(params.start_or_default(), 10);

        assert!(matches!(
            parse_query_pairs(pairs(&[("start", "-5")])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_body_is_default_params() {
        let params = parse_body(b"").unwrap();
        assert!(params.query.is_none());
        assert!(parse_body(b"  \n").unwrap().status.is_none());
    }

    #[test]
    fn test_body_parse_errors_are_validation() {
        assert!(matches!(parse_body(b"{nope"), Err(AppError::Validation(_))));
        assert!(matches!(parse_body(b"[1, 2]"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_body_fields() {
        let params = parse_body(br#"{"query": "agua", "start": "20"}"#).unwrap();
        assert_eq!(params.query.as_deref(), Some("agua"));
        assert_eq!(params.start_or_default(), 20);
    }
}
