//! # Network Storage
//!
//! One-mode registries and two-mode relation tables. Every table guards
//! its own collection with a `parking_lot::RwLock`, so independent tables
//! can be mutated from different threads without a global lock.
//!
//! ## Tables
//!
//! | Table | Module | Holds |
//! |-------|--------|-------|
//! | `EntityRegistry<K>` | `registry` | Entities of one kind |
//! | `RelationTable<E>` | `relation` | Weighted edges of type `E` |
//! | `AllocationTable` | `allocation` | Percentage allocations, kept within budget |
//! | `InteractionTable` | `interaction` | Symmetric actor–actor interaction counts |
//!
//! The object-safe `OneMode` and `TwoMode` traits let the meta-network
//! walk every table uniformly (cascade removal, duplication, projection).

pub mod registry;
pub mod relation;
pub mod allocation;
pub mod interaction;

use crate::model::*;
use crate::Result;

pub use registry::EntityRegistry;
pub use relation::RelationTable;
pub use allocation::{AllocationTable, FULL_ALLOCATION};
pub use interaction::InteractionTable;

// ============================================================================
// OneMode
// ============================================================================

/// Kind-erased view of an entity registry.
pub trait OneMode: Send + Sync {
    fn kind(&self) -> Kind;
    fn exists(&self, id: EntityId) -> bool;
    fn remove(&self, id: EntityId) -> usize;
    /// Registered ids, sorted ascending.
    fn ids(&self) -> Vec<EntityId>;
    fn count(&self) -> usize;
    /// Register a copy of `id` under a freshly minted id and return it.
    fn duplicate(&self, id: EntityId) -> Result<EntityId>;
}

// ============================================================================
// TwoMode
// ============================================================================

/// Edge-type-erased view of a relation table.
pub trait TwoMode: Send + Sync {
    fn count(&self) -> usize;

    /// `(source, target, weight)` for every edge, in insertion order.
    fn triples(&self) -> Vec<(EntityId, EntityId, f32)>;

    /// Whether any edge references `id` (as source, target or scope).
    fn touches(&self, id: EntityId) -> bool;

    fn remove_source(&self, id: EntityId) -> usize;
    fn remove_target(&self, id: EntityId) -> usize;
    fn remove_scope(&self, id: EntityId) -> usize;

    fn copy_source_edges(&self, from: EntityId, to: EntityId) -> usize;
    fn copy_target_edges(&self, from: EntityId, to: EntityId) -> usize;
    fn copy_scope_edges(&self, from: EntityId, to: EntityId) -> usize;
}
