use chrono::{DateTime, Utc};

use happyfactory_core::DomainResult;

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **timestamped** in UTC (business time, defaulting to "now")
/// - designed to be **append-only**
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "products.product.created").
    fn event_type(&self) -> &str;

    /// When the event occurred.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Re-check the construction invariants.
    ///
    /// Constructors already enforce these, but an event may also arrive through
    /// deserialization. The store calls this before appending.
    fn validate(&self) -> DomainResult<()> {
        Ok(())
    }
}
