//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use ocdsearch::engine::{EngineError, EngineResult, InMemoryEngine, SearchEngine};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// A minimal release carrying a tender
pub fn release(tender_id: &str, title: &str, status: &str) -> Value {
    json!({
        "ocid": format!("ocds-test-{}", tender_id),
        "date": "2016-03-01T10:00:00Z",
        "buyer": {"name": "Ayuntamiento de Prueba"},
        "tender": {
            "id": tender_id,
            "title": title,
            "status": status
        }
    })
}

/// Write `files` (name, contents) into a fresh temporary directory
pub fn fixture_dir(files: &[(&str, String)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

/// Glob matching every `*.json` file in `dir`
pub fn json_pattern(dir: &Path) -> String {
    dir.join("*.json").to_string_lossy().into_owned()
}

/// Two invalid JSON files, one release without a tender and two valid releases
pub fn mixed_fixture() -> TempDir {
    fixture_dir(&[
        ("01_valid.json", release("T-1", "Reparación de carreteras", "active").to_string()),
        ("02_broken.json", "{\"tender\": ".to_string()),
        ("03_no_tender.json", json!({"ocid": "ocds-x", "awards": []}).to_string()),
        ("04_not_json.json", "plain text".to_string()),
        ("05_valid.json", release("T-2", "Suministro de agua", "complete").to_string()),
    ])
}

/// What [`ScriptedEngine`] does on its trigger submission
#[derive(Clone, Copy)]
pub enum Trigger {
    /// Cancel the token and never answer
    CancelAndHang,
    /// Answer with a server error
    Fail,
}

/// Wraps [`InMemoryEngine`] and misbehaves on the `nth` document submission,
/// or on every read when built with [`ScriptedEngine::unreachable`]
pub struct ScriptedEngine {
    pub inner: InMemoryEngine,
    nth: usize,
    trigger: Trigger,
    cancel: CancellationToken,
    submissions: AtomicUsize,
    fail_reads: bool,
}

impl ScriptedEngine {
    pub fn new(nth: usize, trigger: Trigger, cancel: CancellationToken) -> Self {
        Self {
            inner: InMemoryEngine::new(),
            nth,
            trigger,
            cancel,
            submissions: AtomicUsize::new(0),
            fail_reads: false,
        }
    }

    /// Engine whose searches and statistics calls fail as if it were down
    pub fn unreachable() -> Self {
        Self {
            fail_reads: true,
            ..Self::new(0, Trigger::Fail, CancellationToken::new())
        }
    }

    fn read_failure(&self) -> EngineResult<()> {
        if self.fail_reads {
            return Err(EngineError::Connection("connection refused".to_string()));
        }
        Ok(())
    }

    /// Submissions attempted, including the triggering one
    pub fn attempted(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchEngine for ScriptedEngine {
    async fn index_exists(&self, index: &str) -> EngineResult<bool> {
        self.inner.index_exists(index).await
    }

    async fn create_index(&self, index: &str, body: &Value) -> EngineResult<()> {
        self.inner.create_index(index, body).await
    }

    async fn delete_index(&self, index: &str) -> EngineResult<()> {
        self.inner.delete_index(index).await
    }

    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        document: &Value,
    ) -> EngineResult<()> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.nth {
            match self.trigger {
                Trigger::CancelAndHang => {
                    self.cancel.cancel();
                    std::future::pending::<()>().await;
                }
                Trigger::Fail => {
                    return Err(EngineError::Status {
                        status: 500,
                        body: "{\"error\": \"disk full\"}".to_string(),
                    });
                }
            }
        }
        self.inner.index_document(index, doc_type, document).await
    }

    async fn search(&self, index: &str, body: &Value, from: u64) -> EngineResult<Value> {
        self.read_failure()?;
        self.inner.search(index, body, from).await
    }

    async fn index_stats(&self, index: &str) -> EngineResult<Value> {
        self.read_failure()?;
        self.inner.index_stats(index).await
    }
}
