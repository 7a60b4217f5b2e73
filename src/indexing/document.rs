//! Tender document normalization

use crate::error::{AppError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Top-level release keys copied into the tender when it lacks them
pub const INHERITED_KEYS: [&str; 5] = ["awards", "buyer", "contracts", "date", "id"];

/// Field holding the document's tender identifier
pub const TENDER_ID_FIELD: &str = "tenderID";

/// Key of the tender object inside a raw record
pub const TENDER_KEY: &str = "tender";

/// Source of identifiers for tenders that carry none
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Time-ordered UUIDv7 identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Deterministic identifiers (`<prefix>-1`, `<prefix>-2`, ...)
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Canonical document written to the engine
///
/// Always holds a string `tenderID`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TenderDocument(Map<String, Value>);

impl TenderDocument {
    /// The document's tender identifier
    pub fn tender_id(&self) -> &str {
        self.0
            .get(TENDER_ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Build the document to index from one raw record.
///
/// Fails with [`AppError::Schema`] when the record has no `tender` object.
/// Keys from [`INHERITED_KEYS`] present at the top level are copied into the
/// tender unless it already defines them; everything else passes through.
pub fn normalize(raw: Value, ids: &dyn IdGenerator) -> Result<TenderDocument> {
    let Value::Object(mut record) = raw else {
        return Err(AppError::Schema("record is not a JSON object".to_string()));
    };

    let mut tender = match record.remove(TENDER_KEY) {
        Some(Value::Object(tender)) => tender,
        Some(_) => return Err(AppError::Schema("'tender' is not an object".to_string())),
        None => return Err(AppError::Schema("record has no 'tender'".to_string())),
    };

    for key in INHERITED_KEYS {
        if !tender.contains_key(key) {
            if let Some(value) = record.remove(key) {
                tender.insert(key.to_string(), value);
            }
        }
    }

    let tender_id = match tender.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => ids.generate(),
    };
    tender.insert(TENDER_ID_FIELD.to_string(), Value::String(tender_id));

    Ok(TenderDocument(tender))
}
