//! Name-keyed caches of categories and banks.

use alloc::collections::BTreeMap;

use crate::models::{Bank, BankId, Category, CategoryId};

/// Reference entity with an id and a display name.
pub(crate) trait Named: Clone {
    /// Identifier type.
    type Id: Copy + Eq;

    /// Returns the identifier.
    fn id(&self) -> Self::Id;

    /// Returns the display name.
    fn name(&self) -> &str;
}

impl Named for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Bank {
    type Id = BankId;

    fn id(&self) -> BankId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Entities keyed by display name, with exactly one key per id.
#[derive(Debug, Clone)]
pub(crate) struct NameIndex<T> {
    /// Entities by name.
    by_name: BTreeMap<String, T>,
}

impl<T> Default for NameIndex<T> {
    fn default() -> Self {
        Self {
            by_name: BTreeMap::new(),
        }
    }
}

impl<T: Named> NameIndex<T> {
    /// Builds an index from entities, keying each by its own name.
    pub(crate) fn from_entities<I: IntoIterator<Item = T>>(items: I) -> Self {
        let mut index = Self::default();
        for item in items {
            index.insert(item);
        }
        index
    }

    /// Inserts or replaces an entity.
    ///
    /// Any key still pointing at the same id is removed first, so a rename
    /// never leaves the old name behind.
    pub(crate) fn insert(&mut self, item: T) {
        let _stale = self.remove_id(item.id());
        let _old = self.by_name.insert(item.name().to_owned(), item);
    }

    /// Removes the entity with `id`, returning it.
    pub(crate) fn remove_id(&mut self, id: T::Id) -> Option<T> {
        let key = self
            .by_name
            .iter()
            .find(|entry| entry.1.id() == id)
            .map(|entry| entry.0.clone())?;
        self.by_name.remove(&key)
    }

    /// Returns the display name for `id`.
    pub(crate) fn name_of(&self, id: T::Id) -> Option<String> {
        self.by_name
            .values()
            .find(|item| item.id() == id)
            .map(|item| item.name().to_owned())
    }

    /// Returns the entity registered under `name`.
    pub(crate) fn get(&self, name: &str) -> Option<&T> {
        self.by_name.get(name)
    }

    /// Returns all entities ordered by name.
    pub(crate) fn to_vec(&self) -> Vec<T> {
        self.by_name.values().cloned().collect()
    }

    /// Number of entities.
    pub(crate) fn len(&self) -> usize {
        self.by_name.len()
    }
}
