//! Dense indexing of entities for matrix conversion.

use std::hash::Hash;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::EntityId;

/// Immutable bijection between items and positions `0..len`.
///
/// Built once per analysis pass (usually from `EntityRegistry::to_vector`)
/// and never mutated afterwards; a changed registry needs a new index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<T>", into = "Vec<T>")]
#[serde(bound(serialize = "T: Serialize + Clone", deserialize = "T: Deserialize<'de> + Clone"))]
pub struct IndexedVector<T: Eq + Hash + Clone> {
    items: Vec<T>,
    positions: HashMap<T, usize>,
}

impl<T: Eq + Hash + Clone> IndexedVector<T> {
    /// Index `items` in the given order. Repeated items keep their first
    /// position only.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let mut kept = Vec::new();
        let mut positions = HashMap::new();
        for item in items {
            if !positions.contains_key(&item) {
                positions.insert(item.clone(), kept.len());
                kept.push(item);
            }
        }
        Self { items: kept, positions }
    }

    pub fn empty() -> Self {
        Self { items: Vec::new(), positions: HashMap::new() }
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.positions.get(item).copied()
    }

    pub fn item(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.positions.contains_key(item)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Eq + Hash + Clone> From<Vec<T>> for IndexedVector<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T: Eq + Hash + Clone> From<IndexedVector<T>> for Vec<T> {
    fn from(index: IndexedVector<T>) -> Self {
        index.items
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for IndexedVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl IndexedVector<EntityId> {
    /// Sorted union of several id sets.
    pub fn union<'a>(indices: impl IntoIterator<Item = &'a IndexedVector<EntityId>>) -> Self {
        let mut ids: Vec<EntityId> = indices.into_iter().flat_map(|i| i.items.iter().copied()).collect();
        ids.sort();
        ids.dedup();
        Self::new(ids)
    }
}
