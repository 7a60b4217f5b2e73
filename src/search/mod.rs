//! Tender search
//!
//! [`QueryBuilder`] maps request parameters (free text, status, tender id) to
//! an engine query body. [`SearchService`] runs it against the selected index
//! and reshapes the engine response into [`SearchOutcome`], which the HTTP
//! layer serializes as-is.

pub mod query;
pub mod service;

pub use query::{
    validate_index_name, Clause, QueryBody, QueryBuilder, QueryParameters, TermValues,
};
pub use service::{SearchOutcome, SearchResponse, SearchService};
