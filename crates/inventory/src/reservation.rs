use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use happyfactory_core::{DomainError, DomainResult, ProductId};
use happyfactory_events::Event;

/// Command: ReserveInventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveInventory {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Business time; `None` means "now".
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReserveInventory {
    /// Turn the command into the fact it records.
    pub fn into_event(self) -> DomainResult<InventoryReserved> {
        InventoryReserved::new(self.product_id, self.quantity, self.timestamp)
    }
}

/// Event: InventoryReserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryReserved {
    product_id: ProductId,
    quantity: u32,
    timestamp: DateTime<Utc>,
}

impl InventoryReserved {
    pub const EVENT_TYPE: &'static str = "inventory.item.reserved";

    pub fn new(product_id: ProductId, quantity: u32, timestamp: Option<DateTime<Utc>>) -> DomainResult<Self> {
        let event = Self {
            product_id,
            quantity,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        };
        event.validate()?;
        Ok(event)
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

impl Event for InventoryReserved {
    fn event_type(&self) -> &str {
        Self::EVENT_TYPE
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn validate(&self) -> DomainResult<()> {
        self.product_id.ensure_not_nil()?;
        if self.quantity == 0 {
            return Err(DomainError::invalid_argument("quantity must be positive"));
        }
        Ok(())
    }
}

impl core::fmt::Display for InventoryReserved {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "InventoryReserved {{ product_id = {}, quantity = {}, timestamp = {} }}",
            self.product_id,
            self.quantity,
            self.timestamp.to_rfc3339()
        )
    }
}
