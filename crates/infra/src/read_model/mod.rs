//! Disposable read model: entities, the store, and the per-event unit of work.

pub mod entities;
pub mod store;
pub mod unit_of_work;

pub use entities::{InventoryItemReadModel, ProductReadModel};
pub use store::{InMemoryReadModel, ReadModelError, ReadModelStore};
pub use unit_of_work::{ChangeSet, StagedWrite, UnitOfWork, WriteKind};
