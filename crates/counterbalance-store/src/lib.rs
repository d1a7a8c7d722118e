//! Storage layer: the write-once order register, reference documents, the
//! interaction log, and the service that assigns presentation orders.
//!
//! In-memory implementations are always available. DuckDB persistence is
//! behind the `duckdb` feature.

mod error;
pub use error::StoreError;

pub mod assign;
pub mod cache;
pub mod memory;
pub mod seed;
pub mod traits;

mod parquet_io;
pub use parquet_io::{read_parquet, write_parquet};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::{DuckStore, ExportTable, SeedReport};

pub use assign::{AssignError, OrderService, OrderSource, Presentation, Resolution};
pub use cache::CachedOrderStore;
pub use memory::{MemoryDocuments, MemoryEventLog, MemoryOrderStore};
pub use traits::{DocumentRepository, EventSink, OrderStore};
