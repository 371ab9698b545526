//! Entities of the meta-network.
//!
//! Every kind of entity shares the same shape (id, optional name, optional
//! parent, attribute bag). The kind lives in the type through a zero-sized
//! marker so that an actor registry cannot accept a resource, while the
//! runtime [`Kind`] tag drives cross-table dispatch.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::{ClassId, EntityId, PropertyMap, Value};

/// Runtime tag of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    Actor,
    Resource,
    Knowledge,
    Belief,
    Organization,
    Task,
    Event,
    Role,
}

impl Kind {
    pub const ALL: [Kind; 8] = [
        Kind::Actor,
        Kind::Resource,
        Kind::Knowledge,
        Kind::Belief,
        Kind::Organization,
        Kind::Task,
        Kind::Event,
        Kind::Role,
    ];

    /// Class tag a `MetaNetwork` gives the registry of this kind.
    pub fn default_class_id(&self) -> ClassId {
        ClassId(*self as u8 + 1)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Kind::Actor => "actor",
            Kind::Resource => "resource",
            Kind::Knowledge => "knowledge",
            Kind::Belief => "belief",
            Kind::Organization => "organization",
            Kind::Task => "task",
            Kind::Event => "event",
            Kind::Role => "role",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time entity kind marker.
pub trait EntityKind: fmt::Debug + Clone + Copy + PartialEq + Default + Send + Sync + 'static {
    const KIND: Kind;
}

macro_rules! entity_kinds {
    ($($marker:ident => $alias:ident : $kind:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
            pub struct $marker;

            impl EntityKind for $marker {
                const KIND: Kind = Kind::$kind;
            }

            pub type $alias = Entity<$marker>;
        )*
    };
}

entity_kinds! {
    ActorKind => Actor: Actor,
    ResourceKind => Resource: Resource,
    KnowledgeKind => Knowledge: Knowledge,
    BeliefKind => Belief: Belief,
    OrganizationKind => Organization: Organization,
    TaskKind => Task: Task,
    EventKind => Event: Event,
    RoleKind => Role: Role,
}

/// An entity of kind `K`.
///
/// `Clone` is the structural copy: same id, same attributes. Giving a copy
/// a fresh identity (and its relations) is `MetaNetwork::duplicate_entity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<K: EntityKind> {
    pub id: EntityId,
    pub name: Option<String>,
    pub parent: Option<EntityId>,
    pub properties: PropertyMap,
    #[serde(skip)]
    kind: PhantomData<K>,
}

impl<K: EntityKind> Entity<K> {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            name: None,
            parent: None,
            properties: PropertyMap::new(),
            kind: PhantomData,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> Kind {
        K::KIND
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Same attributes under a different identity.
    pub fn with_id(&self, id: EntityId) -> Self {
        Self { id, ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_marker() {
        let a = Actor::new(EntityId::new(1, 1));
        let o = Organization::new(EntityId::new(1, 5));
        assert_eq!(a.kind(), Kind::Actor);
        assert_eq!(o.kind(), Kind::Organization);
    }

    #[test]
    fn test_default_class_ids_are_distinct() {
        let mut ids: Vec<ClassId> = Kind::ALL.iter().map(Kind::default_class_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), Kind::ALL.len());
        assert_eq!(Kind::Actor.default_class_id(), ClassId(1));
    }

    #[test]
    fn test_with_id_keeps_attributes() {
        let a = Actor::new(EntityId::new(1, 1))
            .with_name("Ada")
            .with_property("skill", 0.8f64);
        let b = a.with_id(EntityId::new(9, 1));
        assert_eq!(b.id, EntityId::new(9, 1));
        assert_eq!(b.name.as_deref(), Some("Ada"));
        assert_eq!(b.get("skill"), Some(&Value::Float(0.8)));
    }
}
