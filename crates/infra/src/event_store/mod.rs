//! Append-only event store boundary.
//!
//! The store is the single authority over event ordering. It owns the log and
//! the subscriber registry, and fans each appended event out to subscribers
//! after the log lock has been released.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError};
