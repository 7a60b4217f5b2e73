//! Tender ingestion
//!
//! Turns a directory of OCDS release files into documents in a search index:
//!
//! 1. [`IndexManager`] makes sure the target index exists with the tender
//!    mapping from [`mapping`], dropping it first when asked to.
//! 2. [`IngestionDriver`] walks the files one at a time, skipping the ones
//!    that are not JSON or carry no `tender`, and submits the rest.
//! 3. [`normalize`] builds each submitted document: the release's `tender`
//!    object, completed from the release's top-level keys, plus a `tenderID`.
//!
//! A run returns its [`IngestionCounters`]; it can be cancelled through a
//! `CancellationToken`, in which case the counters so far are returned.

pub mod document;
pub mod driver;
pub mod lifecycle;
pub mod mapping;

pub use document::{
    normalize, IdGenerator, SequentialIdGenerator, TenderDocument, UuidGenerator,
    INHERITED_KEYS, TENDER_ID_FIELD,
};
pub use driver::{IngestionCounters, IngestionDriver, IngestionReport};
pub use lifecycle::{IndexManager, IndexOutcome};
pub use mapping::index_mapping;
