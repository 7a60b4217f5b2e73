//! Search engine boundary
//!
//! Everything this crate needs from the document engine goes through the
//! [`SearchEngine`] trait: index lifecycle calls for the indexer, document
//! submission, query execution and index statistics for the HTTP surface.
//!
//! Two implementations ship with the crate:
//!
//! - [`ElasticClient`]: talks to an Elasticsearch-compatible REST API over
//!   `reqwest`, with a fixed timeout and retry-on-timeout.
//! - [`InMemoryEngine`]: keeps indices in process memory and records every
//!   call; used by the test suites.

mod elastic;
mod error;
mod memory;

pub use elastic::ElasticClient;
pub use error::{EngineError, EngineResult};
pub use memory::{EngineCall, InMemoryEngine};

use async_trait::async_trait;
use serde_json::Value;

/// Document kind under which tenders are stored
pub const TENDER_DOC_TYPE: &str = "tender";

/// Operations the indexer and the search surface need from the engine
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Check whether an index exists
    async fn index_exists(&self, index: &str) -> EngineResult<bool>;

    /// Create an index with the given settings and mappings
    async fn create_index(&self, index: &str, body: &Value) -> EngineResult<()>;

    /// Delete an index and all its documents
    async fn delete_index(&self, index: &str) -> EngineResult<()>;

    /// Store one document; the engine assigns its identity
    async fn index_document(&self, index: &str, doc_type: &str, document: &Value)
        -> EngineResult<()>;

    /// Execute a query body starting at offset `from`.
    ///
    /// Returns the raw engine response, which may itself describe an error.
    async fn search(&self, index: &str, body: &Value, from: u64) -> EngineResult<Value>;

    /// Raw index statistics as reported by the engine
    async fn index_stats(&self, index: &str) -> EngineResult<Value>;
}
