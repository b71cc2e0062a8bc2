//! Products domain module (event-sourced).
//!
//! This crate contains business rules for products, implemented purely as
//! deterministic domain logic (no IO, no storage).

pub mod product;

pub use product::{CreateProduct, Product, ProductCreated};
