//! Counterbalanced presentation orders: order matrices, deterministic row
//! mapping, placement, and the types shared with the store and CLI.

pub mod config;
pub mod event;
pub mod latin;
pub mod model;
pub mod placement;
pub mod row_mapper;
pub mod schema;

pub use config::{CachePolicy, ConfigError, EngineConfig};
pub use event::{EventError, EventType, InteractionEvent, LogRequest};
pub use latin::{Construction, LatinSquare, OrderMatrix, SampledOrders, SquareError};
pub use model::{
    DocId, Document, OrderAssignment, OrderFormatError, OrderKey, Query, QueryId,
    TIMESTAMP_PRECISION, decode_order, encode_order,
};
pub use placement::{Placement, place};
pub use row_mapper::{MapperError, row_index, stable_hash};
pub use schema::export;
