//! Projection of domain events into the read model.
//!
//! Projections are:
//! - **Rebuildable**: the read model can be reconstructed from the event log
//! - **Idempotent on creation**: a repeated `ProductCreated` changes nothing
//! - **Isolated per event**: one failing event never stops the engine

pub mod engine;
pub mod error;
pub mod handlers;
pub mod replay;

pub use engine::{ProjectionEngine, ProjectionState, ProjectionStats};
pub use error::ProjectionError;
pub use handlers::{ProjectionOutcome, apply_event};
pub use replay::{ReplayHandle, ReplayReport};
