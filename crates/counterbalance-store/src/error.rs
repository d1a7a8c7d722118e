use counterbalance_core::OrderFormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("parquet file not found: {0}")]
    ParquetNotFound(std::path::PathBuf),

    #[error("stored order for {key} is corrupt: {source}")]
    CorruptOrder {
        key: String,
        source: OrderFormatError,
    },

    #[error("bad timestamp '{0}' in store")]
    BadTimestamp(String),

    #[error("order for {0} missing after a conflicting write")]
    LostWrite(String),

    #[error("unknown table '{0}' (expected orders or logs)")]
    UnknownTable(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
