//! Event capability and the subscriber contract shared by stores and consumers.

pub mod event;
pub mod subscriber;

pub use event::Event;
pub use subscriber::{Subscriber, SubscriberError, SubscriptionToken, panic_message};
