//! Event handlers that fold domain events into the read model.
//!
//! Each handler runs in its own [`UnitOfWork`]; nothing it stages is visible
//! until the unit commits, and a failed commit writes nothing.

use tracing::debug;

use happyfactory_events::Event;
use happyfactory_inventory::InventoryReserved;
use happyfactory_products::ProductCreated;

use crate::event::DomainEvent;
use crate::read_model::{InventoryItemReadModel, ProductReadModel, ReadModelError, ReadModelStore, UnitOfWork};

use super::ProjectionError;

/// Retries for a read-modify-write that lost a race to another commit.
const MAX_UPDATE_ATTEMPTS: u32 = 64;

/// What applying one event did to the read model.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProjectionOutcome {
    /// Writes were committed.
    Applied,
    /// The event was already reflected; nothing changed.
    Skipped,
    /// The event kind is not projected.
    Ignored,
}

/// Dispatch one event on its kind.
pub fn apply_event<R>(read_model: &R, event: &DomainEvent) -> Result<ProjectionOutcome, ProjectionError>
where
    R: ReadModelStore + ?Sized,
{
    match event {
        DomainEvent::ProductCreated(ev) => on_product_created(read_model, ev),
        DomainEvent::InventoryReserved(ev) => on_inventory_reserved(read_model, ev),
        DomainEvent::Unrecognized(ev) => {
            debug!(event_type = ev.event_type(), "ignoring unsupported event type");
            Ok(ProjectionOutcome::Ignored)
        }
    }
}

fn on_product_created<R>(read_model: &R, ev: &ProductCreated) -> Result<ProjectionOutcome, ProjectionError>
where
    R: ReadModelStore + ?Sized,
{
    let id = ev.product_id();
    let mut uow = UnitOfWork::begin(read_model);

    if uow.find_product(&id).is_some() {
        return Ok(ProjectionOutcome::Skipped);
    }

    uow.add_product(ProductReadModel {
        id,
        name: ev.name().to_string(),
        sku: ev.sku().to_string(),
    });
    uow.add_inventory_item_if_absent(InventoryItemReadModel::empty(id));
    uow.save_changes()?;

    Ok(ProjectionOutcome::Applied)
}

fn on_inventory_reserved<R>(read_model: &R, ev: &InventoryReserved) -> Result<ProjectionOutcome, ProjectionError>
where
    R: ReadModelStore + ?Sized,
{
    let id = ev.product_id();
    let mut attempt = 1;

    loop {
        let mut uow = UnitOfWork::begin(read_model);
        uow.update_inventory_item(id, |current| {
            current
                .unwrap_or_else(|| InventoryItemReadModel::empty(id))
                .after_reservation(ev.quantity())
        });

        match uow.save_changes() {
            Err(ReadModelError::Conflict { .. }) if attempt < MAX_UPDATE_ATTEMPTS => {
                debug!(product_id = %id, attempt, "inventory item changed concurrently; retrying");
                attempt += 1;
            }
            result => {
                result?;
                return Ok(ProjectionOutcome::Applied);
            }
        }
    }
}
