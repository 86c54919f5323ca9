//! Portfolio module
//!
//! Virtual positions, their lifecycle engine and snapshot persistence.

mod engine;
mod store;
mod types;

pub use engine::{EngineConfig, OpenRejection, PositionEngine};
pub use store::{JsonFileStore, MemoryStore, PositionStore, StoreError};
pub use types::{
    ExitReason, PortfolioState, Position, PositionEvent, PositionStage, PriceSample, TpLevel,
};
