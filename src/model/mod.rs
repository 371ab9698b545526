//! # Meta-network Model
//!
//! Pure data shared by every layer: identifiers, entities, edges and the
//! attribute values they carry.
//!
//! No locks and no tables here. Storage, projection and analysis live in
//! their own modules.

pub mod id;
pub mod entity;
pub mod edge;
pub mod value;
pub mod property_map;

pub use id::{EntityId, ClassId};
pub use entity::{
    Entity, EntityKind, Kind,
    Actor, Resource, Knowledge, Belief, Organization, Task, Event, Role,
    ActorKind, ResourceKind, KnowledgeKind, BeliefKind, OrganizationKind,
    TaskKind, EventKind, RoleKind,
};
pub use edge::{Edge, Link, Allocation, UsageTag, KnowledgeLink, BeliefLink, RoleLink};
pub use value::Value;
pub use property_map::PropertyMap;
