//! The closed set of events this system stores and projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use happyfactory_core::{DomainError, DomainResult, require_non_blank};
use happyfactory_events::Event;
use happyfactory_inventory::InventoryReserved;
use happyfactory_products::ProductCreated;

/// An event of a kind this build does not know.
///
/// Kept (rather than rejected) so that newer producers can share a store with
/// older consumers; projections ignore it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecognizedEvent {
    event_type: String,
    payload: JsonValue,
    timestamp: DateTime<Utc>,
}

impl UnrecognizedEvent {
    pub fn new(
        event_type: impl Into<String>,
        payload: JsonValue,
        timestamp: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        let event = Self {
            event_type: event_type.into(),
            payload,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        };
        event.validate()?;
        Ok(event)
    }

    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }
}

impl Event for UnrecognizedEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn validate(&self) -> DomainResult<()> {
        require_non_blank("event_type", &self.event_type)?;
        match self.event_type.as_str() {
            ProductCreated::EVENT_TYPE | InventoryReserved::EVENT_TYPE => Err(DomainError::invalid_argument(format!(
                "{} is a known event type",
                self.event_type
            ))),
            _ => Ok(()),
        }
    }
}

/// Every event the store accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    ProductCreated(ProductCreated),
    InventoryReserved(InventoryReserved),
    Unrecognized(UnrecognizedEvent),
}

impl DomainEvent {
    /// Decode a payload by its type name.
    ///
    /// Unknown names decode to [`DomainEvent::Unrecognized`]; a known name with a
    /// malformed or invalid payload is an `InvalidArgument` error.
    pub fn from_json(event_type: &str, payload: JsonValue) -> DomainResult<Self> {
        let decode_err = |e: serde_json::Error| DomainError::invalid_argument(format!("{event_type}: {e}"));

        let event = match event_type {
            ProductCreated::EVENT_TYPE => Self::ProductCreated(serde_json::from_value(payload).map_err(decode_err)?),
            InventoryReserved::EVENT_TYPE => {
                Self::InventoryReserved(serde_json::from_value(payload).map_err(decode_err)?)
            }
            other => {
                let timestamp = payload
                    .get("timestamp")
                    .and_then(JsonValue::as_str)
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|t| t.with_timezone(&Utc));
                Self::Unrecognized(UnrecognizedEvent::new(other, payload, timestamp)?)
            }
        };
        event.validate()?;
        Ok(event)
    }
}

impl Event for DomainEvent {
    fn event_type(&self) -> &str {
        match self {
            DomainEvent::ProductCreated(e) => e.event_type(),
            DomainEvent::InventoryReserved(e) => e.event_type(),
            DomainEvent::Unrecognized(e) => e.event_type(),
        }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::ProductCreated(e) => e.timestamp(),
            DomainEvent::InventoryReserved(e) => e.timestamp(),
            DomainEvent::Unrecognized(e) => e.timestamp(),
        }
    }

    fn validate(&self) -> DomainResult<()> {
        match self {
            DomainEvent::ProductCreated(e) => e.validate(),
            DomainEvent::InventoryReserved(e) => e.validate(),
            DomainEvent::Unrecognized(e) => e.validate(),
        }
    }
}

impl From<ProductCreated> for DomainEvent {
    fn from(value: ProductCreated) -> Self {
        Self::ProductCreated(value)
    }
}

impl From<InventoryReserved> for DomainEvent {
    fn from(value: InventoryReserved) -> Self {
        Self::InventoryReserved(value)
    }
}

impl From<UnrecognizedEvent> for DomainEvent {
    fn from(value: UnrecognizedEvent) -> Self {
        Self::Unrecognized(value)
    }
}
