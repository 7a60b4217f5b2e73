//! OCDSearch
//!
//! Loads Open Contracting (OCDS) release files into a search engine index
//! and serves full-text and filtered tender search over HTTP.
//!
//! - [`indexing`]: index lifecycle, document normalization and the bulk
//!   ingestion driver behind `ocds-index`.
//! - [`search`]: query building and the search handler behind `ocds-search`.
//! - [`engine`]: the engine boundary, with an HTTP client and an in-memory
//!   implementation.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod indexing;
pub mod metrics;
pub mod search;
pub mod telemetry;

pub use error::{AppError, Result};
