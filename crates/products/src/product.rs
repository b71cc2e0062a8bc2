use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use happyfactory_core::{Aggregate, AggregateRoot, DomainError, DomainResult, ProductId, require_non_blank};
use happyfactory_events::Event;

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    sku: String,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            name: String::new(),
            sku: String::new(),
            version: 0,
            created: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    /// Business time; `None` means "now".
    pub timestamp: Option<DateTime<Utc>>,
}

/// Event: ProductCreated.
///
/// Fields are private so that every instance built in-process went through
/// [`ProductCreated::new`]. Deserialized instances are checked by `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    product_id: ProductId,
    name: String,
    sku: String,
    timestamp: DateTime<Utc>,
}

impl ProductCreated {
    pub const EVENT_TYPE: &'static str = "products.product.created";

    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        sku: impl Into<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        let event = Self {
            product_id,
            name: name.into(),
            sku: sku.into(),
            timestamp: timestamp.unwrap_or_else(Utc::now),
        };
        event.validate()?;
        Ok(event)
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }
}

impl Event for ProductCreated {
    fn event_type(&self) -> &str {
        Self::EVENT_TYPE
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn validate(&self) -> DomainResult<()> {
        self.product_id.ensure_not_nil()?;
        require_non_blank("name", &self.name)?;
        require_non_blank("sku", &self.sku)
    }
}

impl core::fmt::Display for ProductCreated {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "ProductCreated {{ product_id = {}, name = {}, sku = {}, timestamp = {} }}",
            self.product_id,
            self.name,
            self.sku,
            self.timestamp.to_rfc3339()
        )
    }
}

impl Aggregate for Product {
    type Command = CreateProduct;
    type Event = ProductCreated;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        self.id = event.product_id;
        self.name = event.name.clone();
        self.sku = event.sku.clone();
        self.created = true;

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, cmd: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.product_id != self.id {
            return Err(DomainError::invalid_argument("product_id does not match aggregate"));
        }

        let event = ProductCreated::new(cmd.product_id, cmd.name.clone(), cmd.sku.clone(), cmd.timestamp)?;
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use happyfactory_core::execute;
    use uuid::Uuid;

    fn create_cmd(product_id: ProductId, name: &str, sku: &str) -> CreateProduct {
        CreateProduct {
            product_id,
            name: name.to_string(),
            sku: sku.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn create_product_emits_product_created_event() {
        let product_id = ProductId::new();
        let product = Product::empty(product_id);

        let events = product.handle(&create_cmd(product_id, "Widget", "W-1")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].product_id(), product_id);
        assert_eq!(events[0].name(), "Widget");
        assert_eq!(events[0].sku(), "W-1");
        assert_eq!(events[0].event_type(), "products.product.created");
    }

    #[test]
    fn execute_applies_the_emitted_event() {
        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);

        execute(&mut product, &create_cmd(product_id, "Widget", "W-1")).unwrap();

        assert!(product.is_created());
        assert_eq!(product.version(), 1);
        assert_eq!(product.name(), "Widget");
        assert_eq!(product.sku(), "W-1");
    }

    #[test]
    fn creating_twice_is_a_conflict() {
        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);
        execute(&mut product, &create_cmd(product_id, "Widget", "W-1")).unwrap();

        let err = product.handle(&create_cmd(product_id, "Widget", "W-1")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn create_product_rejects_blank_fields() {
        let product_id = ProductId::new();
        let product = Product::empty(product_id);

        let err = product.handle(&create_cmd(product_id, "  ", "W-1")).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = product.handle(&create_cmd(product_id, "Widget", "")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn event_constructor_rejects_nil_id() {
        let err = ProductCreated::new(ProductId::from_uuid(Uuid::nil()), "Widget", "W-1", None).unwrap_err();
        assert_eq!(err, DomainError::InvalidArgument("ProductId must not be empty".to_string()));
    }

    #[test]
    fn explicit_timestamp_is_kept() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let ev = ProductCreated::new(ProductId::new(), "Widget", "W-1", Some(at)).unwrap();
        assert_eq!(ev.timestamp(), at);
    }

    #[test]
    fn deserialized_event_is_revalidated() {
        let json = serde_json::json!({
            "product_id": Uuid::nil(),
            "name": "Widget",
            "sku": "W-1",
            "timestamp": "2024-05-01T12:00:00Z",
        });
        let ev: ProductCreated = serde_json::from_value(json).unwrap();
        assert!(ev.validate().is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any non-blank name/sku yields a valid event carrying them verbatim.
            #[test]
            fn non_blank_inputs_always_construct(
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                sku in "[A-Z0-9-]{1,20}"
            ) {
                let id = ProductId::new();
                let ev = ProductCreated::new(id, name.clone(), sku.clone(), None).unwrap();
                prop_assert_eq!(ev.product_id(), id);
                prop_assert_eq!(ev.name(), name.as_str());
                prop_assert_eq!(ev.sku(), sku.as_str());
            }

            /// Property: whitespace-only names are always rejected.
            #[test]
            fn blank_names_always_rejected(name in "[ \t]{0,10}") {
                let result = ProductCreated::new(ProductId::new(), name, "W-1", None);
                prop_assert!(result.is_err());
            }
        }
    }
}
