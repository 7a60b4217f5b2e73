//! Bulk ingestion of tender files

use crate::engine::{SearchEngine, TENDER_DOC_TYPE};
use crate::error::{AppError, Result};
use crate::indexing::document::{normalize, IdGenerator, UuidGenerator};
use crate::indexing::lifecycle::{IndexManager, IndexOutcome};
use crate::metrics::{INGEST_DOCUMENTS_TOTAL, INGEST_RUNS_TOTAL};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Per-run file counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionCounters {
    pub indexed: u64,
    pub not_tender: u64,
    pub not_json: u64,
}

impl fmt::Display for IngestionCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TOTAL {} indexed, {} not tender, {} not json",
            self.indexed, self.not_tender, self.not_json
        )
    }
}

/// Result of one ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub counters: IngestionCounters,

    /// The run stopped early on a cancellation signal
    pub cancelled: bool,

    /// What happened to the index during setup; `None` if cancelled before it finished
    pub index: Option<IndexOutcome>,
}

enum FileOutcome {
    Indexed,
    NotTender,
    NotJson,
    Cancelled,
}

/// Drives one pass over a set of tender files
pub struct IngestionDriver {
    engine: Arc<dyn SearchEngine>,
    index_manager: IndexManager,
    ids: Arc<dyn IdGenerator>,
    delete_existing: bool,
}

impl IngestionDriver {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            index_manager: IndexManager::new(engine.clone()),
            engine,
            ids: Arc::new(UuidGenerator),
            delete_existing: false,
        }
    }

    /// Use a different identifier source for tenders without an id
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Drop and recreate the index before ingesting
    pub fn with_delete_existing(mut self, delete_existing: bool) -> Self {
        self.delete_existing = delete_existing;
        self
    }

    /// Index every file matching `pattern` into `index`.
    ///
    /// Unreadable, non-JSON and non-tender files are counted and skipped.
    /// An engine failure ends the run with an error. Cancellation stops the
    /// run and returns the counters gathered so far.
    pub async fn run(
        &self,
        pattern: &str,
        index: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport> {
        let entries: Vec<_> = glob::glob(pattern)?.collect();

        let mut report = IngestionReport {
            counters: IngestionCounters::default(),
            cancelled: false,
            index: None,
        };

        let setup = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = self.index_manager.ensure_index(index, self.delete_existing) => Some(outcome),
        };
        match setup {
            Some(Ok(outcome)) => report.index = Some(outcome),
            Some(Err(e)) => {
                error!(index, error = %e, "Failed to prepare index");
                INGEST_RUNS_TOTAL.with_label_values(&["failed"]).inc();
                return Err(e.into());
            }
            None => {
                warn!("CANCELLED");
                report.cancelled = true;
                INGEST_RUNS_TOTAL.with_label_values(&["cancelled"]).inc();
                info!("{}", report.counters);
                return Ok(report);
            }
        }

        for entry in entries {
            if cancel.is_cancelled() {
                warn!("CANCELLED");
                report.cancelled = true;
                break;
            }

            let outcome = match entry {
                Ok(path) => self.ingest_file(&path, index, cancel).await,
                Err(e) => {
                    error!("NOT_JSON {} ({})", e.path().display(), e.error());
                    INGEST_DOCUMENTS_TOTAL.with_label_values(&["not_json"]).inc();
                    Ok(FileOutcome::NotJson)
                }
            };

            match outcome {
                Ok(FileOutcome::Indexed) => report.counters.indexed += 1,
                Ok(FileOutcome::NotTender) => report.counters.not_tender += 1,
                Ok(FileOutcome::NotJson) => report.counters.not_json += 1,
                Ok(FileOutcome::Cancelled) => {
                    warn!("CANCELLED");
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Ingestion aborted; {}", report.counters);
                    INGEST_RUNS_TOTAL.with_label_values(&["failed"]).inc();
                    return Err(e);
                }
            }
        }

        let result = if report.cancelled { "cancelled" } else { "completed" };
        INGEST_RUNS_TOTAL.with_label_values(&[result]).inc();
        info!("{}", report.counters);

        Ok(report)
    }

    async fn ingest_file(
        &self,
        path: &Path,
        index: &str,
        cancel: &CancellationToken,
    ) -> Result<FileOutcome> {
        let record = match read_json(path).await {
            Ok(record) => record,
            Err(e) => {
                error!("NOT_JSON {} ({})", path.display(), e);
                INGEST_DOCUMENTS_TOTAL.with_label_values(&["not_json"]).inc();
                return Ok(FileOutcome::NotJson);
            }
        };

        let document = match normalize(record, self.ids.as_ref()) {
            Ok(document) => document,
            Err(e) => {
                warn!("NOT_TENDER {} ({})", path.display(), e);
                INGEST_DOCUMENTS_TOTAL.with_label_values(&["not_tender"]).inc();
                return Ok(FileOutcome::NotTender);
            }
        };

        info!("INDEX {}", path.display());
        let body = document.into_value();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(FileOutcome::Cancelled),
            result = self.engine.index_document(index, TENDER_DOC_TYPE, &body) => {
                result?;
                INGEST_DOCUMENTS_TOTAL.with_label_values(&["indexed"]).inc();
                Ok(FileOutcome::Indexed)
            }
        }
    }
}

async fn read_json(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&text).map_err(|e| AppError::Parse(e.to_string()))
}
