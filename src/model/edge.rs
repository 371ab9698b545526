//! Edges of the two-mode networks.

use serde::{Deserialize, Serialize};

use super::EntityId;

/// Contract every edge stored in a `RelationTable` satisfies.
///
/// An edge is identified by its key. By default the key is the
/// `(source, target)` pair; edge types that allow several edges per pair
/// (allocations per usage, roles per organization) widen it.
pub trait Edge: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn source(&self) -> EntityId;
    fn target(&self) -> EntityId;
    fn weight(&self) -> f32;
    fn set_weight(&mut self, weight: f32);

    /// Container the edge is scoped to, if any.
    fn scope(&self) -> Option<EntityId> {
        None
    }

    /// Keys always include the source; tables look keys up per source.
    fn same_key(&self, other: &Self) -> bool {
        self.source() == other.source() && self.target() == other.target()
    }

    /// Copy of this edge re-attached to another source.
    fn with_source(&self, source: EntityId) -> Self;

    /// Copy of this edge re-attached to another target.
    fn with_target(&self, target: EntityId) -> Self;

    /// Copy of this edge moved to another scope. Unscoped edges are unchanged.
    fn with_scope(&self, _scope: EntityId) -> Self {
        self.clone()
    }

    fn touches(&self, id: EntityId) -> bool {
        self.source() == id || self.target() == id
    }
}

// ============================================================================
// Link: plain weighted edge
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: EntityId,
    pub target: EntityId,
    pub weight: f32,
}

impl Link {
    pub fn new(source: EntityId, target: EntityId, weight: f32) -> Self {
        Self { source, target, weight }
    }

    /// Unit-weight link.
    pub fn unit(source: EntityId, target: EntityId) -> Self {
        Self::new(source, target, 1.0)
    }
}

impl Edge for Link {
    fn source(&self) -> EntityId { self.source }
    fn target(&self) -> EntityId { self.target }
    fn weight(&self) -> f32 { self.weight }
    fn set_weight(&mut self, weight: f32) { self.weight = weight; }
    fn with_source(&self, source: EntityId) -> Self { Self { source, ..*self } }
    fn with_target(&self, target: EntityId) -> Self { Self { target, ..*self } }
}

// ============================================================================
// Allocation: percentage of capacity
// ============================================================================

/// Usage tag distinguishing several allocations between the same pair
/// (a resource used both as a tool and as a workspace, say).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct UsageTag(pub u8);

impl UsageTag {
    pub const DEFAULT: UsageTag = UsageTag(0);
}

/// Allocation edge: `allocation` is a percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub source: EntityId,
    pub target: EntityId,
    pub allocation: f32,
    pub usage: UsageTag,
}

impl Allocation {
    pub fn new(source: EntityId, target: EntityId, allocation: f32) -> Self {
        Self { source, target, allocation, usage: UsageTag::DEFAULT }
    }

    pub fn with_usage(mut self, usage: UsageTag) -> Self {
        self.usage = usage;
        self
    }
}

impl Edge for Allocation {
    fn source(&self) -> EntityId { self.source }
    fn target(&self) -> EntityId { self.target }
    fn weight(&self) -> f32 { self.allocation }
    fn set_weight(&mut self, weight: f32) { self.allocation = weight; }

    fn same_key(&self, other: &Self) -> bool {
        self.source == other.source && self.target == other.target && self.usage == other.usage
    }

    fn with_source(&self, source: EntityId) -> Self { Self { source, ..*self } }
    fn with_target(&self, target: EntityId) -> Self { Self { target, ..*self } }
}

// ============================================================================
// Actor–knowledge and actor–belief
// ============================================================================

/// An actor's level of a knowledge item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeLink {
    pub actor: EntityId,
    pub knowledge: EntityId,
    pub value: f32,
}

impl KnowledgeLink {
    pub fn new(actor: EntityId, knowledge: EntityId, value: f32) -> Self {
        Self { actor, knowledge, value }
    }
}

impl Edge for KnowledgeLink {
    fn source(&self) -> EntityId { self.actor }
    fn target(&self) -> EntityId { self.knowledge }
    fn weight(&self) -> f32 { self.value }
    fn set_weight(&mut self, weight: f32) { self.value = weight; }
    fn with_source(&self, actor: EntityId) -> Self { Self { actor, ..*self } }
    fn with_target(&self, knowledge: EntityId) -> Self { Self { knowledge, ..*self } }
}

/// An actor's stance on a belief, in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefLink {
    pub actor: EntityId,
    pub belief: EntityId,
    pub value: f32,
}

impl BeliefLink {
    pub fn new(actor: EntityId, belief: EntityId, value: f32) -> Self {
        Self { actor, belief, value }
    }
}

impl Edge for BeliefLink {
    fn source(&self) -> EntityId { self.actor }
    fn target(&self) -> EntityId { self.belief }
    fn weight(&self) -> f32 { self.value }
    fn set_weight(&mut self, weight: f32) { self.value = weight; }
    fn with_source(&self, actor: EntityId) -> Self { Self { actor, ..*self } }
    fn with_target(&self, belief: EntityId) -> Self { Self { belief, ..*self } }
}

// ============================================================================
// Actor–role, scoped to an organization
// ============================================================================

/// Role held by an actor inside one organization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleLink {
    pub actor: EntityId,
    pub role: EntityId,
    pub organization: EntityId,
    pub weight: f32,
}

impl RoleLink {
    pub fn new(actor: EntityId, role: EntityId, organization: EntityId) -> Self {
        Self { actor, role, organization, weight: 1.0 }
    }
}

impl Edge for RoleLink {
    fn source(&self) -> EntityId { self.actor }
    fn target(&self) -> EntityId { self.role }
    fn weight(&self) -> f32 { self.weight }
    fn set_weight(&mut self, weight: f32) { self.weight = weight; }
    fn scope(&self) -> Option<EntityId> { Some(self.organization) }

    fn same_key(&self, other: &Self) -> bool {
        self.actor == other.actor && self.role == other.role && self.organization == other.organization
    }

    fn with_source(&self, actor: EntityId) -> Self { Self { actor, ..*self } }
    fn with_target(&self, role: EntityId) -> Self { Self { role, ..*self } }
    fn with_scope(&self, organization: EntityId) -> Self { Self { organization, ..*self } }

    fn touches(&self, id: EntityId) -> bool {
        self.actor == id || self.role == id || self.organization == id
    }
}
