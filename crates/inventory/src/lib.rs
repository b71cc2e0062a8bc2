//! Inventory domain module (event-sourced).
//!
//! Reservations are recorded as facts; the resulting stock level is derived by
//! projections, never stored on an aggregate.

pub mod reservation;

pub use reservation::{InventoryReserved, ReserveInventory};
