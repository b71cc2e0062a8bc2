use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use happyfactory_events::{Event, Subscriber, SubscriberError, SubscriptionToken, panic_message};

use super::r#trait::{EventStore, EventStoreError};

type SubscriberMap<E> = BTreeMap<SubscriptionToken, Arc<dyn Subscriber<E>>>;

/// In-memory append-only event store.
///
/// Not durable: the log lives as long as the store. The log and the subscriber
/// registry sit behind separate locks, and neither is held while subscribers
/// run, so a subscriber may append or (un)subscribe from inside its callback.
pub struct InMemoryEventStore<E> {
    log: Mutex<Vec<E>>,
    subscribers: Mutex<SubscriberMap<E>>,
    next_token: AtomicU64,
}

impl<E: Event> InMemoryEventStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events in the log.
    pub fn len(&self) -> usize {
        self.log.lock().map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|subs| subs.len()).unwrap_or(0)
    }

    /// Subscribers registered right now, in subscription order.
    ///
    /// A poisoned registry is still read; fan-out never fails an append.
    fn current_subscribers(&self) -> Vec<(SubscriptionToken, Arc<dyn Subscriber<E>>)> {
        let subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subs.iter().map(|(token, sub)| (*token, Arc::clone(sub))).collect()
    }

    /// Deliver events one by one, each to every subscriber, without holding any lock.
    fn notify(&self, events: &[E]) {
        let subscribers = self.current_subscribers();
        for event in events {
            for (token, subscriber) in &subscribers {
                Self::invoke(*token, subscriber.as_ref(), event);
            }
        }
    }

    fn invoke(token: SubscriptionToken, subscriber: &dyn Subscriber<E>, event: &E) {
        let err = match panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_event(event))) {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => SubscriberError::Panicked(panic_message(payload.as_ref())),
        };

        // Swallowed: subscribers own their error handling.
        warn!(
            subscription = %token,
            event_type = event.event_type(),
            error = %err,
            "subscriber failed; continuing fan-out"
        );
    }
}

impl<E> Default for InMemoryEventStore<E> {
    fn default() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            subscribers: Mutex::new(BTreeMap::new()),
            next_token: AtomicU64::new(1),
        }
    }
}

impl<E> core::fmt::Debug for InMemoryEventStore<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryEventStore")
            .field("events", &self.log.lock().map(|log| log.len()).ok())
            .field("subscribers", &self.subscribers.lock().map(|subs| subs.len()).ok())
            .finish()
    }
}

impl<E: Event> EventStore<E> for InMemoryEventStore<E> {
    fn append(&self, event: E) -> Result<usize, EventStoreError> {
        self.append_batch(vec![event])
    }

    fn append_batch(&self, events: Vec<E>) -> Result<usize, EventStoreError> {
        if events.is_empty() {
            return Ok(0);
        }
        for event in &events {
            event.validate()?;
        }

        {
            let mut log = self.log.lock().map_err(|_| EventStoreError::Poisoned("log"))?;
            log.extend(events.iter().cloned());
        }

        self.notify(&events);
        Ok(events.len())
    }

    fn subscribe(&self, subscriber: Arc<dyn Subscriber<E>>) -> Result<SubscriptionToken, EventStoreError> {
        let token = SubscriptionToken::from_raw(self.next_token.fetch_add(1, Ordering::Relaxed));
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| EventStoreError::Poisoned("subscribers"))?;
        subs.insert(token, subscriber);
        Ok(token)
    }

    fn unsubscribe(&self, token: SubscriptionToken) -> Result<bool, EventStoreError> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| EventStoreError::Poisoned("subscribers"))?;
        Ok(subs.remove(&token).is_some())
    }

    fn get_all(&self) -> Result<Vec<E>, EventStoreError> {
        let log = self.log.lock().map_err(|_| EventStoreError::Poisoned("log"))?;
        Ok(log.clone())
    }
}
