pub mod handlers;
pub mod routes;
#[cfg(unix)]
pub mod server;

pub use routes::*;

use crate::search::SearchService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
}

impl AppState {
    pub fn new(search: Arc<SearchService>) -> Self {
        Self { search }
    }
}
