use thiserror::Error;

use crate::event_store::EventStoreError;
use crate::read_model::ReadModelError;

use super::engine::ProjectionState;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("read model error: {0}")]
    ReadModel(#[from] ReadModelError),

    #[error("event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("projection panicked: {0}")]
    Panicked(String),

    #[error("cannot {action} a projection engine that is {state}")]
    InvalidState {
        action: &'static str,
        state: ProjectionState,
    },

    #[error("replay task aborted: {0}")]
    ReplayAborted(String),

    #[error("projection lifecycle lock poisoned")]
    Poisoned,
}
