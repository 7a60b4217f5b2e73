//! Prometheus metrics for the indexer and the search gateway.
//!
//! All metrics live in one global registry under the `ocdsearch` namespace:
//! - Ingestion outcomes per file and per run
//! - Search requests by outcome shape, and their latency
//! - Engine requests by operation and result, plus retries
//!
//! Metrics are always recorded; they are only exported once
//! [`init_metrics`] has registered them.
//!
//! # Example
//! ```no_run
//! use ocdsearch::metrics::{gather_metrics, init_metrics, INGEST_DOCUMENTS_TOTAL};
//!
//! init_metrics().unwrap();
//! INGEST_DOCUMENTS_TOTAL.with_label_values(&["indexed"]).inc();
//! println!("{}", gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry};
use std::io;
use std::path::Path;

const NAMESPACE: &str = "ocdsearch";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Ingestion Metrics
    // ============================================================================

    /// Files handled by the ingestion driver
    ///
    /// Labels: outcome (indexed, not_tender, not_json)
    pub static ref INGEST_DOCUMENTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("ingest_documents_total", "Files handled by the ingestion driver")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create INGEST_DOCUMENTS_TOTAL metric");

    /// Ingestion runs by how they ended
    ///
    /// Labels: result (completed, cancelled, failed)
    pub static ref INGEST_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("ingest_runs_total", "Ingestion runs by how they ended")
            .namespace(NAMESPACE),
        &["result"]
    ).expect("Failed to create INGEST_RUNS_TOTAL metric");

    // ============================================================================
    // Search Metrics
    // ============================================================================

    /// Search requests by response shape
    ///
    /// Labels: outcome (reshaped, passthrough, error)
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_requests_total", "Search requests by response shape")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create SEARCH_REQUESTS_TOTAL metric");

    /// Search request duration in seconds, engine round trip included
    pub static ref SEARCH_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "search_duration_seconds",
            "Search request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).expect("Failed to create SEARCH_DURATION_SECONDS metric");

    // ============================================================================
    // Engine Metrics
    // ============================================================================

    /// Requests sent to the search engine
    ///
    /// Labels: operation, result (success, error)
    pub static ref ENGINE_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("engine_requests_total", "Requests sent to the search engine")
            .namespace(NAMESPACE),
        &["operation", "result"]
    ).expect("Failed to create ENGINE_REQUESTS_TOTAL metric");

    /// Engine requests retried after a timeout
    ///
    /// Labels: operation
    pub static ref ENGINE_RETRIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("engine_retries_total", "Engine requests retried after a timeout")
            .namespace(NAMESPACE),
        &["operation"]
    ).expect("Failed to create ENGINE_RETRIES_TOTAL metric");
}

/// Register all metrics with the global registry.
///
/// Fails with `AlreadyReg` when called twice in one process.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(INGEST_DOCUMENTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(INGEST_RUNS_TOTAL.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(ENGINE_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(ENGINE_RETRIES_TOTAL.clone()))?;

    tracing::debug!("Prometheus metrics registered");
    Ok(())
}

/// Record the result of one engine request
pub fn record_engine_request(operation: &str, success: bool) {
    let result = if success { "success" } else { "error" };
    ENGINE_REQUESTS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

/// Write all metrics to `path` for a node exporter textfile collector.
///
/// The file is replaced through a rename so a scrape never sees half of it.
pub fn write_metrics(path: &Path) -> io::Result<()> {
    let staging = path.with_extension("prom.tmp");
    std::fs::write(&staging, gather_metrics())?;
    std::fs::rename(&staging, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        // The registry is process-global; a second registration reports AlreadyReg
        let result = init_metrics();
        assert!(result.is_ok() || matches!(result, Err(prometheus::Error::AlreadyReg)));

        INGEST_DOCUMENTS_TOTAL.with_label_values(&["indexed"]).inc();
        let output = gather_metrics();
        assert!(output.contains("ocdsearch_ingest_documents_total"));
    }

    #[test]
    fn test_write_metrics_replaces_file() {
        let _ = init_metrics();
        INGEST_RUNS_TOTAL.with_label_values(&["completed"]).inc();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocds_index.prom");
        std::fs::write(&path, "stale").unwrap();

        write_metrics(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("ocdsearch_ingest_runs_total"));
        assert!(!written.contains("stale"));
        assert!(!dir.path().join("ocds_index.prom.tmp").exists());
    }

    #[test]
    fn test_write_metrics_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_metrics(&dir.path().join("nope").join("m.prom")).is_err());
    }

    #[test]
    fn test_record_engine_request() {
        let before = ENGINE_REQUESTS_TOTAL
            .with_label_values(&["search", "error"])
            .get();
        record_engine_request("search", false);
        let after = ENGINE_REQUESTS_TOTAL
            .with_label_values(&["search", "error"])
            .get();
        assert_eq!(after - before, 1.0);
    }
}
