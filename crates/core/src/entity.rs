//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Read-model entities are immutable values keyed by their identifier; an
/// "update" replaces the whole value stored under `key()`.
pub trait Entity: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Strongly-typed primary key.
    type Key: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// Returns the primary key.
    fn key(&self) -> Self::Key;
}
