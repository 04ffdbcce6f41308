use std::cell::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;

use crate::ids::OrderEntryId;
use crate::order::{OrderEntry, OrderEntryType};

/// Why a proposed order is not a permutation of the current one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RearrangeError {
    #[error("size mismatch: old size={old}; new size={new}")]
    SizeMismatch { old: usize, new: usize },
    #[error("trying to add nonexisting order entry {0}")]
    UnknownEntry(OrderEntryId),
    #[error("trying to add duplicate order entry {0}")]
    DuplicateEntry(OrderEntryId),
}

/// Ordered order entries.
///
/// Every mutation keeps each entry's [`OrderEntry::index`] equal to its offset
/// and drops the materialized snapshot handed out by [`OrderList::snapshot`].
#[derive(Debug, Clone, Default)]
pub(crate) struct OrderList {
    entries: Vec<OrderEntry>,
    snapshot: OnceCell<Arc<[OrderEntry]>>,
}

impl OrderList {
    pub(crate) fn as_slice(&self) -> &[OrderEntry] {
        &self.entries
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, OrderEntry> {
        self.entries.iter()
    }

    pub(crate) fn get(&self, id: OrderEntryId) -> Option<&OrderEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub(crate) fn position_of(&self, id: OrderEntryId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    pub(crate) fn contains(&self, id: OrderEntryId) -> bool {
        self.position_of(id).is_some()
    }

    /// Read-only view, rebuilt lazily after a mutation.
    pub(crate) fn snapshot(&self) -> Arc<[OrderEntry]> {
        self.snapshot
            .get_or_init(|| self.entries.iter().cloned().collect())
            .clone()
    }

    pub(crate) fn push(&mut self, entry: OrderEntry) {
        self.insert(self.entries.len(), entry);
    }

    pub(crate) fn insert(&mut self, position: usize, entry: OrderEntry) {
        self.entries.insert(position, entry);
        self.reindex_from(position);
    }

    /// Inserts an SDK entry after the last SDK entry, else after the module
    /// source entry, else at the front. Returns the position used.
    pub(crate) fn insert_sdk(&mut self, entry: OrderEntry) -> usize {
        let after_last_sdk = self
            .entries
            .iter()
            .rposition(|existing| {
                matches!(
                    existing.entry_type(),
                    OrderEntryType::ModuleExtensionSdk | OrderEntryType::InheritedSdk
                )
            })
            .map(|position| position + 1);
        let position = after_last_sdk
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|existing| existing.entry_type() == OrderEntryType::ModuleSource)
                    .map(|position| position + 1)
            })
            .unwrap_or(0);
        self.insert(position, entry);
        position
    }

    pub(crate) fn remove(&mut self, position: usize) -> OrderEntry {
        let entry = self.entries.remove(position);
        self.reindex_from(position);
        entry
    }

    pub(crate) fn remove_entry(&mut self, id: OrderEntryId) -> Option<OrderEntry> {
        let position = self.position_of(id)?;
        Some(self.remove(position))
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&OrderEntry) -> bool) {
        self.entries.retain(keep);
        self.reindex_from(0);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.snapshot.take();
    }

    pub(crate) fn replace_all(&mut self, entries: impl IntoIterator<Item = OrderEntry>) {
        self.entries = entries.into_iter().collect();
        self.reindex_from(0);
    }

    /// Applies `update` to the entry with `id`. Returns `None` when absent.
    pub(crate) fn update<R>(
        &mut self,
        id: OrderEntryId,
        update: impl FnOnce(&mut OrderEntry) -> R,
    ) -> Option<R> {
        let position = self.position_of(id)?;
        let result = update(&mut self.entries[position]);
        self.snapshot.take();
        Some(result)
    }

    pub(crate) fn check_rearrangement(&self, order: &[OrderEntryId]) -> Result<(), RearrangeError> {
        if order.len() != self.entries.len() {
            return Err(RearrangeError::SizeMismatch {
                old: self.entries.len(),
                new: order.len(),
            });
        }
        let mut seen = HashSet::with_capacity(order.len());
        for &id in order {
            if !self.contains(id) {
                return Err(RearrangeError::UnknownEntry(id));
            }
            if !seen.insert(id) {
                return Err(RearrangeError::DuplicateEntry(id));
            }
        }
        Ok(())
    }

    /// Reorders the entries to match `order`, which must be a permutation of the current ids.
    pub(crate) fn rearrange(&mut self, order: &[OrderEntryId]) -> Result<(), RearrangeError> {
        self.check_rearrangement(order)?;
        let mut previous: Vec<Option<OrderEntry>> =
            std::mem::take(&mut self.entries).into_iter().map(Some).collect();
        for &id in order {
            let slot = previous
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|entry| entry.id() == id));
            if let Some(entry) = slot.and_then(Option::take) {
                self.entries.push(entry);
            }
        }
        self.reindex_from(0);
        Ok(())
    }

    fn reindex_from(&mut self, start: usize) {
        for (index, entry) in self.entries.iter_mut().enumerate().skip(start) {
            entry.set_index(index);
        }
        self.snapshot.take();
    }
}
