//! Command handling: validate, decide, append.
//!
//! ```text
//! Command
//!   ↓
//! 1. Build the aggregate (fresh id for creations)
//!   ↓
//! 2. Handle command (pure decision logic, produces events)
//!   ↓
//! 3. Append events to the store (subscribers are notified by the store)
//! ```
//!
//! Validation failures surface before anything is appended.

use thiserror::Error;

use happyfactory_core::{Aggregate, DomainError, ProductId, execute};
use happyfactory_inventory::ReserveInventory;
use happyfactory_products::{CreateProduct, Product};

use crate::event::DomainEvent;
use crate::event_store::{EventStore, EventStoreError};

#[derive(Debug, Error)]
pub enum CommandError {
    /// Domain validation or invariant failure; nothing was appended.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Appending to the event store failed.
    #[error("event store error: {0}")]
    Store(EventStoreError),
}

impl From<EventStoreError> for CommandError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::InvalidArgument(domain) => CommandError::Domain(domain),
            other => CommandError::Store(other),
        }
    }
}

impl CommandError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CommandError::Domain(err) if err.is_invalid_argument())
    }
}

/// Application-level entry point for producers.
#[derive(Debug, Clone)]
pub struct CommandHandler<S> {
    store: S,
}

impl<S> CommandHandler<S>
where
    S: EventStore<DomainEvent>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a product under a fresh time-ordered id and return that id.
    pub fn create_product(&self, name: impl Into<String>, sku: impl Into<String>) -> Result<ProductId, CommandError> {
        let product_id = ProductId::new();
        let command = CreateProduct {
            product_id,
            name: name.into(),
            sku: sku.into(),
            timestamp: None,
        };

        let mut product = Product::empty(product_id);
        self.decide_and_append(&mut product, &command)?;
        Ok(product_id)
    }

    /// Record a reservation against a product's stock.
    pub fn reserve_inventory(&self, command: ReserveInventory) -> Result<(), CommandError> {
        let event = command.into_event()?;
        self.store.append(event.into())?;
        Ok(())
    }

    fn decide_and_append<A>(&self, aggregate: &mut A, command: &A::Command) -> Result<usize, CommandError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: Into<DomainEvent>,
    {
        let events = execute(aggregate, command)?;
        let written = self
            .store
            .append_batch(events.into_iter().map(Into::into).collect())?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::InMemoryEventStore;
    use happyfactory_events::Event;
    use uuid::Uuid;

    fn handler() -> CommandHandler<InMemoryEventStore<DomainEvent>> {
        CommandHandler::new(InMemoryEventStore::new())
    }

    #[test]
    fn create_product_appends_one_event_with_a_fresh_id() {
        let handler = handler();
        let id = handler.create_product("Widget", "W-1").unwrap();

        let log = handler.store().get_all().unwrap();
        assert_eq!(log.len(), 1);
        match &log[0] {
            DomainEvent::ProductCreated(ev) => {
                assert_eq!(ev.product_id(), id);
                assert_eq!(ev.name(), "Widget");
                assert_eq!(ev.sku(), "W-1");
            }
            other => panic!("expected ProductCreated, got {other:?}"),
        }
        assert_eq!(id.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn blank_name_appends_nothing() {
        let handler = handler();
        let err = handler.create_product("   ", "W-1").unwrap_err();

        assert!(err.is_invalid_argument());
        assert!(handler.store().is_empty());
    }

    #[test]
    fn reservation_is_appended() {
        let handler = handler();
        let id = handler.create_product("Widget", "W-1").unwrap();

        handler
            .reserve_inventory(ReserveInventory {
                product_id: id,
                quantity: 3,
                timestamp: None,
            })
            .unwrap();

        let log = handler.store().get_all().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].event_type(), "inventory.item.reserved");
    }

    #[test]
    fn invalid_reservation_appends_nothing() {
        let handler = handler();

        let zero = handler.reserve_inventory(ReserveInventory {
            product_id: ProductId::new(),
            quantity: 0,
            timestamp: None,
        });
        let nil = handler.reserve_inventory(ReserveInventory {
            product_id: ProductId::from_uuid(Uuid::nil()),
            quantity: 1,
            timestamp: None,
        });

        assert!(zero.unwrap_err().is_invalid_argument());
        assert!(nil.unwrap_err().is_invalid_argument());
        assert!(handler.store().is_empty());
    }

    #[test]
    fn store_validation_errors_map_to_domain_errors() {
        let err: CommandError = EventStoreError::InvalidArgument(DomainError::invalid_argument("bad")).into();
        assert!(err.is_invalid_argument());

        let err: CommandError = EventStoreError::Poisoned("log").into();
        assert!(matches!(err, CommandError::Store(_)));
    }
}
