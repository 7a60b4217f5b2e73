//! Index lifecycle management

use crate::engine::{EngineResult, SearchEngine};
use crate::indexing::mapping::index_mapping;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// What `ensure_index` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    /// Index was already there and left alone
    Existing,
    /// Index did not exist and was created
    Created,
    /// Index was deleted and created again
    Recreated,
}

/// Creates tender indices with the expected mapping
#[derive(Clone)]
pub struct IndexManager {
    engine: Arc<dyn SearchEngine>,
}

impl IndexManager {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine }
    }

    /// Make sure `name` exists, optionally dropping it first.
    ///
    /// Engine failures are returned as they are; no retries happen here.
    pub async fn ensure_index(&self, name: &str, delete_existing: bool) -> EngineResult<IndexOutcome> {
        let exists = self.engine.index_exists(name).await?;

        if exists && !delete_existing {
            info!(index = name, "Using existing index");
            return Ok(IndexOutcome::Existing);
        }

        if exists {
            self.engine.delete_index(name).await?;
            info!(index = name, "Deleted existing index");
        }

        self.engine.create_index(name, &index_mapping()).await?;
        info!(index = name, "Created index");

        Ok(if exists {
            IndexOutcome::Recreated
        } else {
            IndexOutcome::Created
        })
    }
}
