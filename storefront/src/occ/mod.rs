//! Commerce API (OCC) types and backends.

pub mod backend;
pub mod memory;
pub mod models;

pub use backend::{BackendFuture, BackendOperation, CommerceBackend, OccError, SearchQuery};
pub use memory::{CatalogData, CatalogError, InMemoryBackend};
