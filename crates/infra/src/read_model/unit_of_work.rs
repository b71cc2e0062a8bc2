//! Per-event unit of work over the read model.
//!
//! A unit stages writes, reads through its own staged writes, and hands the
//! whole change set to the store in one `commit`. Dropping a unit without
//! calling [`UnitOfWork::save_changes`] discards everything it staged.

use std::collections::HashMap;

use happyfactory_core::{Entity, ProductId};

use super::entities::{InventoryItemReadModel, ProductReadModel};
use super::store::{ReadModelError, ReadModelStore};

/// How a staged value is written at commit time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteKind {
    /// Insert; the commit fails if the key already exists.
    Insert,
    /// Insert only when the key is absent at commit time; otherwise skip.
    InsertIfAbsent,
    /// Replace (or create) the value stored under the key.
    Replace,
    /// Replace only if the committed value still equals `expected`; otherwise
    /// the commit fails with `Conflict`.
    CompareAndReplace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedWrite<T> {
    pub kind: WriteKind,
    pub value: T,
    /// Committed value the write was computed from (`None`: absent).
    /// Only checked for [`WriteKind::CompareAndReplace`].
    pub expected: Option<T>,
}

/// Writes belonging to one event, keyed per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub products: HashMap<ProductId, StagedWrite<ProductReadModel>>,
    pub inventory_items: HashMap<ProductId, StagedWrite<InventoryItemReadModel>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.inventory_items.is_empty()
    }
}

/// Stage a write; the last write staged for a key wins.
fn stage<T: Entity<Key = ProductId>>(table: &mut HashMap<ProductId, StagedWrite<T>>, kind: WriteKind, value: T) {
    table.insert(
        value.key(),
        StagedWrite {
            kind,
            value,
            expected: None,
        },
    );
}

/// Read a key as the unit currently sees it.
fn read_through<T: Entity<Key = ProductId>>(
    table: &HashMap<ProductId, StagedWrite<T>>,
    key: &ProductId,
    committed: Option<T>,
) -> Option<T> {
    match table.get(key) {
        Some(w) if w.kind == WriteKind::InsertIfAbsent => committed.or_else(|| Some(w.value.clone())),
        Some(w) => Some(w.value.clone()),
        None => committed,
    }
}

/// Transaction-like scope for the writes of a single event.
pub struct UnitOfWork<'a, R: ReadModelStore + ?Sized> {
    store: &'a R,
    changes: ChangeSet,
}

impl<'a, R: ReadModelStore + ?Sized> UnitOfWork<'a, R> {
    pub fn begin(store: &'a R) -> Self {
        Self {
            store,
            changes: ChangeSet::default(),
        }
    }

    pub fn find_product(&self, id: &ProductId) -> Option<ProductReadModel> {
        read_through(&self.changes.products, id, self.store.product(id))
    }

    pub fn find_inventory_item(&self, product_id: &ProductId) -> Option<InventoryItemReadModel> {
        read_through(
            &self.changes.inventory_items,
            product_id,
            self.store.inventory_item(product_id),
        )
    }

    pub fn add_product(&mut self, product: ProductReadModel) {
        stage(&mut self.changes.products, WriteKind::Insert, product);
    }

    pub fn add_inventory_item_if_absent(&mut self, item: InventoryItemReadModel) {
        stage(&mut self.changes.inventory_items, WriteKind::InsertIfAbsent, item);
    }

    pub fn replace_inventory_item(&mut self, item: InventoryItemReadModel) {
        stage(&mut self.changes.inventory_items, WriteKind::Replace, item);
    }

    /// Stage a read-modify-write of one inventory item.
    ///
    /// `update` sees the item as this unit sees it. The commit fails with
    /// [`ReadModelError::Conflict`] if another commit changed the stored item
    /// after it was read here.
    pub fn update_inventory_item(
        &mut self,
        product_id: ProductId,
        update: impl FnOnce(Option<InventoryItemReadModel>) -> InventoryItemReadModel,
    ) {
        let committed = self.store.inventory_item(&product_id);
        let current = read_through(&self.changes.inventory_items, &product_id, committed);
        let value = update(current);
        self.changes.inventory_items.insert(
            product_id,
            StagedWrite {
                kind: WriteKind::CompareAndReplace,
                value,
                expected: committed,
            },
        );
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Commit every staged write atomically. Returns the number of writes applied.
    pub fn save_changes(self) -> Result<usize, ReadModelError> {
        if self.changes.is_empty() {
            return Ok(0);
        }
        self.store.commit(self.changes)
    }
}
