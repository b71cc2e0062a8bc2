use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use happyfactory_core::ProductId;

use super::entities::{InventoryItemReadModel, ProductReadModel};
use super::unit_of_work::{ChangeSet, StagedWrite, WriteKind};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReadModelError {
    #[error("duplicate {entity} key: {key}")]
    DuplicateKey { entity: &'static str, key: ProductId },

    #[error("{entity} {key} changed since it was read")]
    Conflict { entity: &'static str, key: ProductId },

    #[error("read model lock poisoned")]
    Poisoned,
}

/// Queryable storage for the disposable read model.
///
/// Reads see only committed state. Writes arrive as whole change sets through
/// [`ReadModelStore::commit`], which applies all of them or none.
pub trait ReadModelStore: Send + Sync {
    fn product(&self, id: &ProductId) -> Option<ProductReadModel>;
    fn inventory_item(&self, product_id: &ProductId) -> Option<InventoryItemReadModel>;
    fn products(&self) -> Vec<ProductReadModel>;
    fn inventory_items(&self) -> Vec<InventoryItemReadModel>;

    /// Apply a change set atomically. Returns the number of writes applied.
    fn commit(&self, changes: ChangeSet) -> Result<usize, ReadModelError>;

    /// Drop every record (rebuild support).
    fn clear(&self);
}

impl<R> ReadModelStore for Arc<R>
where
    R: ReadModelStore + ?Sized,
{
    fn product(&self, id: &ProductId) -> Option<ProductReadModel> {
        (**self).product(id)
    }

    fn inventory_item(&self, product_id: &ProductId) -> Option<InventoryItemReadModel> {
        (**self).inventory_item(product_id)
    }

    fn products(&self) -> Vec<ProductReadModel> {
        (**self).products()
    }

    fn inventory_items(&self) -> Vec<InventoryItemReadModel> {
        (**self).inventory_items()
    }

    fn commit(&self, changes: ChangeSet) -> Result<usize, ReadModelError> {
        (**self).commit(changes)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, ProductReadModel>,
    inventory_items: HashMap<ProductId, InventoryItemReadModel>,
}

/// In-memory read model for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReadModel {
    tables: RwLock<Tables>,
}

impl InMemoryReadModel {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reject the change set if a strict insert hits an existing key or a
/// compare-and-replace no longer matches the stored value.
fn check_writes<T: PartialEq>(
    entity: &'static str,
    table: &HashMap<ProductId, T>,
    staged: &HashMap<ProductId, StagedWrite<T>>,
) -> Result<(), ReadModelError> {
    for (key, write) in staged {
        match write.kind {
            WriteKind::Insert if table.contains_key(key) => {
                return Err(ReadModelError::DuplicateKey { entity, key: *key });
            }
            WriteKind::CompareAndReplace if table.get(key) != write.expected.as_ref() => {
                return Err(ReadModelError::Conflict { entity, key: *key });
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_writes<V>(table: &mut HashMap<ProductId, V>, staged: HashMap<ProductId, StagedWrite<V>>) -> usize {
    let mut applied = 0;
    for (key, write) in staged {
        match write.kind {
            WriteKind::InsertIfAbsent if table.contains_key(&key) => continue,
            _ => {
                table.insert(key, write.value);
                applied += 1;
            }
        }
    }
    applied
}

impl ReadModelStore for InMemoryReadModel {
    fn product(&self, id: &ProductId) -> Option<ProductReadModel> {
        let tables = self.tables.read().ok()?;
        tables.products.get(id).cloned()
    }

    fn inventory_item(&self, product_id: &ProductId) -> Option<InventoryItemReadModel> {
        let tables = self.tables.read().ok()?;
        tables.inventory_items.get(product_id).copied()
    }

    fn products(&self) -> Vec<ProductReadModel> {
        match self.tables.read() {
            Ok(tables) => tables.products.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    fn inventory_items(&self) -> Vec<InventoryItemReadModel> {
        match self.tables.read() {
            Ok(tables) => tables.inventory_items.values().copied().collect(),
            Err(_) => vec![],
        }
    }

    fn commit(&self, changes: ChangeSet) -> Result<usize, ReadModelError> {
        let mut tables = self.tables.write().map_err(|_| ReadModelError::Poisoned)?;

        check_writes("product", &tables.products, &changes.products)?;
        check_writes("inventory item", &tables.inventory_items, &changes.inventory_items)?;

        let applied = apply_writes(&mut tables.products, changes.products)
            + apply_writes(&mut tables.inventory_items, changes.inventory_items);
        Ok(applied)
    }

    fn clear(&self) {
        if let Ok(mut tables) = self.tables.write() {
            tables.products.clear();
            tables.inventory_items.clear();
        }
    }
}
