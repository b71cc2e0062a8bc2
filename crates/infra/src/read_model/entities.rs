use happyfactory_core::{Entity, ProductId};

/// Queryable product read model (catalog).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductReadModel {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
}

impl Entity for ProductReadModel {
    type Key = ProductId;

    fn key(&self) -> ProductId {
        self.id
    }
}

/// Queryable inventory read model: stock left per product, never negative.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InventoryItemReadModel {
    pub product_id: ProductId,
    pub ending_quantity: u32,
}

impl InventoryItemReadModel {
    pub fn new(product_id: ProductId, ending_quantity: u32) -> Self {
        Self {
            product_id,
            ending_quantity,
        }
    }

    /// A freshly materialized item with nothing in stock.
    pub fn empty(product_id: ProductId) -> Self {
        Self::new(product_id, 0)
    }

    /// The replacement value after reserving `quantity`, clamped at zero.
    pub fn after_reservation(&self, quantity: u32) -> Self {
        Self::new(self.product_id, self.ending_quantity.saturating_sub(quantity))
    }
}

impl Entity for InventoryItemReadModel {
    type Key = ProductId;

    fn key(&self) -> ProductId {
        self.product_id
    }
}
