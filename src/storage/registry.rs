//! One-mode network: the registry of every entity of one kind.

use std::sync::atomic::{AtomicU32, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::*;
use crate::{Error, Result};
use super::OneMode;

/// Entities in insertion order plus an id -> position index.
struct Entities<K: EntityKind> {
    list: Vec<Entity<K>>,
    positions: HashMap<EntityId, usize>,
}

impl<K: EntityKind> Entities<K> {
    fn get(&self, id: EntityId) -> Option<&Entity<K>> {
        self.positions.get(&id).map(|&i| &self.list[i])
    }

    /// Push unless the id is taken.
    fn insert(&mut self, entity: Entity<K>) -> bool {
        if self.positions.contains_key(&entity.id) {
            return false;
        }
        self.positions.insert(entity.id, self.list.len());
        self.list.push(entity);
        true
    }

    fn remove(&mut self, id: EntityId) -> usize {
        let Some(pos) = self.positions.remove(&id) else {
            return 0;
        };
        self.list.remove(pos);
        for i in self.positions.values_mut() {
            if *i > pos {
                *i -= 1;
            }
        }
        1
    }
}

/// Insertion-ordered registry of entities of kind `K`.
///
/// Ids minted by [`EntityRegistry::next_id`] come from a per-registry
/// counter that only moves forward and never wraps: once every `u16` id
/// has been handed out, minting fails with [`Error::OutOfRange`]. The
/// counter does not look at ids added by hand; [`EntityRegistry::create`]
/// refuses a minted id that is already registered.
pub struct EntityRegistry<K: EntityKind> {
    class_id: ClassId,
    entities: RwLock<Entities<K>>,
    next_id: AtomicU32,
}

impl<K: EntityKind> EntityRegistry<K> {
    pub fn new(class_id: ClassId) -> Self {
        Self {
            class_id,
            entities: RwLock::new(Entities { list: Vec::new(), positions: HashMap::new() }),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Return the next id of this registry and advance the counter.
    pub fn next_id(&self) -> Result<EntityId> {
        let id = self
            .next_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n <= u32::from(u16::MAX)).then_some(n + 1)
            })
            .map_err(|_| Error::OutOfRange(format!("{} id space exhausted", K::KIND)))?;
        let id = u16::try_from(id)
            .map_err(|_| Error::OutOfRange(format!("{} id space exhausted", K::KIND)))?;
        Ok(EntityId { id, class_id: self.class_id })
    }

    /// Mint an id and register a bare entity under it.
    pub fn create(&self) -> Result<EntityId> {
        let id = self.next_id()?;
        self.insert_minted(Entity::new(id))
    }

    /// Mint an id and register a named entity under it.
    pub fn create_named(&self, name: impl Into<String>) -> Result<EntityId> {
        let id = self.next_id()?;
        self.insert_minted(Entity::new(id).with_name(name))
    }

    fn insert_minted(&self, entity: Entity<K>) -> Result<EntityId> {
        let id = entity.id;
        if !self.entities.write().insert(entity) {
            return Err(Error::ConstraintViolation(format!("{} {id} is already registered", K::KIND)));
        }
        tracing::trace!(kind = %K::KIND, id = %id, "entity created");
        Ok(id)
    }

    /// Insert an entity. Returns false (and changes nothing) if its id is
    /// already registered.
    pub fn add(&self, entity: Entity<K>) -> bool {
        let id = entity.id;
        let added = self.entities.write().insert(entity);
        if added {
            tracing::trace!(kind = %K::KIND, id = %id, "entity added");
        }
        added
    }

    /// Remove the entity carrying `id`. Returns how many were removed.
    pub fn remove(&self, id: EntityId) -> usize {
        self.entities.write().remove(id)
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.read().positions.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<Entity<K>> {
        self.entities.read().get(id).cloned()
    }

    /// Apply `f` to the entity in place. `f` must not change the id.
    pub fn update(&self, id: EntityId, f: impl FnOnce(&mut Entity<K>)) -> Result<()> {
        let mut entities = self.entities.write();
        let pos = *entities
            .positions
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("{} {id}", K::KIND)))?;
        f(&mut entities.list[pos]);
        Ok(())
    }

    pub fn filtered_by_class(&self, class_id: ClassId) -> Vec<Entity<K>> {
        self.entities
            .read()
            .list
            .iter()
            .filter(|e| e.id.is_class(class_id))
            .cloned()
            .collect()
    }

    /// All entities in insertion order.
    pub fn all(&self) -> Vec<Entity<K>> {
        self.entities.read().list.clone()
    }

    /// Registered ids sorted ascending. Matrix rows and columns are laid
    /// out in exactly this order.
    pub fn to_vector(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.read().list.iter().map(|e| e.id).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entities.read().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().list.is_empty()
    }

    pub fn clear(&self) {
        let mut entities = self.entities.write();
        entities.list.clear();
        entities.positions.clear();
    }
}

impl<K: EntityKind> OneMode for EntityRegistry<K> {
    fn kind(&self) -> Kind {
        K::KIND
    }

    fn exists(&self, id: EntityId) -> bool {
        EntityRegistry::exists(self, id)
    }

    fn remove(&self, id: EntityId) -> usize {
        EntityRegistry::remove(self, id)
    }

    fn ids(&self) -> Vec<EntityId> {
        self.to_vector()
    }

    fn count(&self) -> usize {
        self.len()
    }

    fn duplicate(&self, id: EntityId) -> Result<EntityId> {
        let original = self
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("{} {id}", K::KIND)))?;
        let new_id = self.next_id()?;
        self.insert_minted(original.with_id(new_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actors() -> EntityRegistry<ActorKind> {
        EntityRegistry::new(ClassId(1))
    }

    #[test]
    fn test_next_id_is_monotonic() {
        let reg = actors();
        let a = reg.next_id().unwrap();
        let b = reg.next_id().unwrap();
        assert_eq!(a, EntityId::new(1, 1));
        assert_eq!(b, EntityId::new(2, 1));
        // Removal never frees an id for reuse.
        let c = reg.create().unwrap();
        reg.remove(c);
        assert_eq!(reg.next_id().unwrap(), EntityId::new(4, 1));
    }

    #[test]
    fn test_add_is_idempotent() {
        let reg = actors();
        let id = reg.next_id().unwrap();
        assert!(reg.add(Actor::new(id)));
        assert!(!reg.add(Actor::new(id).with_name("again")));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(id).unwrap().name, None);
    }

    #[test]
    fn test_to_vector_sorted_by_id() {
        let reg = actors();
        reg.add(Actor::new(EntityId::new(5, 1)));
        reg.add(Actor::new(EntityId::new(2, 1)));
        reg.add(Actor::new(EntityId::new(9, 1)));
        assert_eq!(
            reg.to_vector(),
            vec![EntityId::new(2, 1), EntityId::new(5, 1), EntityId::new(9, 1)]
        );
        // Insertion order is kept for plain iteration.
        assert_eq!(reg.all()[0].id, EntityId::new(5, 1));
    }

    #[test]
    fn test_filtered_by_class() {
        let reg = actors();
        reg.add(Actor::new(EntityId::new(1, 1)));
        reg.add(Actor::new(EntityId::new(2, 7)));
        reg.add(Actor::new(EntityId::new(3, 7)));
        assert_eq!(reg.filtered_by_class(ClassId(7)).len(), 2);
        assert_eq!(reg.filtered_by_class(ClassId(3)).len(), 0);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let reg = actors();
        let err = reg.update(EntityId::new(1, 1), |a| a.name = Some("x".into()));
        assert!(matches!(err, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_duplicate_gets_fresh_id() {
        let reg = actors();
        let id = reg.create_named("Ada").unwrap();
        let copy = OneMode::duplicate(&reg, id).unwrap();
        assert_ne!(copy, id);
        assert_eq!(reg.get(copy).unwrap().name.as_deref(), Some("Ada"));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_id_space_exhaustion_never_reuses() {
        let reg = actors();
        let first = reg.create().unwrap();
        assert_eq!(first, EntityId::new(1, 1));
        for _ in 2..u16::MAX {
            reg.next_id().unwrap();
        }
        let last = reg.create().unwrap();
        assert_eq!(last, EntityId::new(u16::MAX, 1));
        assert!(matches!(reg.create(), Err(Error::OutOfRange(_))));
        assert!(matches!(reg.next_id(), Err(Error::OutOfRange(_))));
        assert!(matches!(OneMode::duplicate(&reg, first), Err(Error::OutOfRange(_))));
        assert_eq!(reg.to_vector(), vec![first, last]);
    }

    #[test]
    fn test_create_refuses_id_added_by_hand() {
        let reg = actors();
        reg.add(Actor::new(EntityId::new(1, 1)).with_name("manual"));
        assert!(matches!(reg.create(), Err(Error::ConstraintViolation(_))));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(EntityId::new(1, 1)).unwrap().name.as_deref(), Some("manual"));
        // The counter moved on; the next mint is free.
        assert_eq!(reg.create().unwrap(), EntityId::new(2, 1));
    }

    #[test]
    fn test_lookup_after_removal_keeps_positions() {
        let reg = actors();
        let ids: Vec<EntityId> = (0..20).map(|_| reg.create().unwrap()).collect();
        assert_eq!(reg.remove(ids[3]), 1);
        assert_eq!(reg.remove(ids[3]), 0);
        reg.update(ids[10], |e| e.name = Some("ten".into())).unwrap();
        assert_eq!(reg.get(ids[10]).unwrap().name.as_deref(), Some("ten"));
        assert_eq!(reg.get(ids[19]).unwrap().id, ids[19]);
        assert!(!reg.exists(ids[3]));
        assert_eq!(reg.len(), 19);
        assert_eq!(reg.all()[3].id, ids[4]);
    }
}
