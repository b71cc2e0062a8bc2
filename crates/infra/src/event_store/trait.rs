use std::sync::Arc;

use thiserror::Error;

use happyfactory_core::DomainError;
use happyfactory_events::{Event, Subscriber, SubscriptionToken};

/// Event store operation error.
///
/// Only malformed input and lock failures are reported here. Subscriber
/// failures are contained inside the store and never surface to the caller.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The event failed its invariant re-check; nothing was appended.
    #[error(transparent)]
    InvalidArgument(#[from] DomainError),

    /// An internal lock was poisoned by a panic while it was held.
    #[error("event store lock poisoned: {0}")]
    Poisoned(&'static str),
}

/// Append-only, in-order event log with synchronous fan-out.
///
/// ## Append Semantics
///
/// `append()` / `append_batch()`:
/// - Validate every event first (an invalid event rejects the whole call)
/// - Insert at the tail under exclusive access (a batch is inserted as one unit)
/// - Release the lock, then notify every current subscriber, event by event,
///   in subscription order
///
/// The total order of the log is the order in which concurrent appenders
/// acquire the lock. Nothing else is promised.
///
/// ## Read Semantics
///
/// `get_all()` returns a point-in-time copy. Later appends never affect a
/// snapshot that was already returned.
pub trait EventStore<E: Event>: Send + Sync {
    /// Append one event. Returns the number of events written.
    fn append(&self, event: E) -> Result<usize, EventStoreError>;

    /// Append a batch atomically, then notify event by event.
    fn append_batch(&self, events: Vec<E>) -> Result<usize, EventStoreError>;

    /// Register a subscriber for every future append (history is not delivered).
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<E>>) -> Result<SubscriptionToken, EventStoreError>;

    /// Remove a subscriber. Idempotent; returns whether anything was removed.
    fn unsubscribe(&self, token: SubscriptionToken) -> Result<bool, EventStoreError>;

    /// Snapshot of the full log in append order.
    fn get_all(&self) -> Result<Vec<E>, EventStoreError>;
}

impl<E, S> EventStore<E> for Arc<S>
where
    E: Event,
    S: EventStore<E> + ?Sized,
{
    fn append(&self, event: E) -> Result<usize, EventStoreError> {
        (**self).append(event)
    }

    fn append_batch(&self, events: Vec<E>) -> Result<usize, EventStoreError> {
        (**self).append_batch(events)
    }

    fn subscribe(&self, subscriber: Arc<dyn Subscriber<E>>) -> Result<SubscriptionToken, EventStoreError> {
        (**self).subscribe(subscriber)
    }

    fn unsubscribe(&self, token: SubscriptionToken) -> Result<bool, EventStoreError> {
        (**self).unsubscribe(token)
    }

    fn get_all(&self) -> Result<Vec<E>, EventStoreError> {
        (**self).get_all()
    }
}
