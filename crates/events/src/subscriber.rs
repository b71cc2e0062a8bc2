//! Subscriber contract (mechanics only).
//!
//! A store fans every appended event out to its subscribers. The contract is
//! intentionally small:
//!
//! - **Synchronous invocation**: the store calls `on_event` on the appending
//!   thread, after the log lock is released. A subscriber that wants to do slow
//!   work should defer it (spawn a task) and return.
//! - **Isolation**: a subscriber that fails (returns an error or panics) does not
//!   prevent the remaining subscribers from being invoked, and the failure is
//!   never reported to the producer that called `append`.
//! - **Self-managed errors**: subscribers own their error handling. The store
//!   only logs what it catches.

use std::any::Any;

use thiserror::Error;

/// Failure raised by a subscriber while handling a notified event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriberError {
    #[error("subscriber failed: {0}")]
    Failed(String),

    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

impl SubscriberError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Receives every event appended after it subscribed.
///
/// Any `Fn(&E) -> Result<(), SubscriberError>` closure is a subscriber.
pub trait Subscriber<E>: Send + Sync {
    fn on_event(&self, event: &E) -> Result<(), SubscriberError>;
}

impl<E, F> Subscriber<E> for F
where
    F: Fn(&E) -> Result<(), SubscriberError> + Send + Sync,
{
    fn on_event(&self, event: &E) -> Result<(), SubscriberError> {
        self(event)
    }
}

/// Capability returned by `subscribe`, used to unsubscribe.
///
/// Tokens are issued in increasing order, so ordering tokens is ordering by
/// subscription time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl core::fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Best-effort extraction of a panic payload's message.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_subscribers() {
        let sub = |n: &u32| {
            if *n == 0 {
                Err(SubscriberError::failed("zero"))
            } else {
                Ok(())
            }
        };
        assert!(sub.on_event(&1).is_ok());
        assert_eq!(sub.on_event(&0), Err(SubscriberError::Failed("zero".to_string())));
    }

    #[test]
    fn tokens_order_by_issue() {
        let a = SubscriptionToken::from_raw(1);
        let b = SubscriptionToken::from_raw(2);
        assert!(a < b);
        assert_eq!(a.to_string(), "sub-1");
    }

    #[test]
    fn panic_messages_are_recovered() {
        let caught = std::panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "boom 7");

        let caught = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "static");
    }
}
