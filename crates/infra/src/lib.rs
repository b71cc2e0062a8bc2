//! Infrastructure layer: event store, read model, projections, command handling.

pub mod command_handler;
pub mod config;
pub mod event;
pub mod event_store;
pub mod projections;
pub mod read_model;
