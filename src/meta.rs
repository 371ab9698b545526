//! # MetaNetwork
//!
//! The aggregate owning one registry per entity kind and one table per
//! relation. Cross-table operations live here so the tables stay
//! consistent with each other.
//!
//! ```text
//!   actors ─┬─ interactions ── actors
//!           ├─ memberships ─── organizations ── organization_resources ── resources
//!           ├─ actor_resources ─────────────────────────────────────────── resources
//!           ├─ actor_knowledge ── knowledge ── task_knowledge ── tasks
//!           ├─ actor_beliefs ──── beliefs
//!           ├─ actor_roles ────── roles  (scoped to an organization)
//!           └─ actor_tasks ────── tasks ── resource_tasks ── resources
//! ```
//!
//! Every relation is described once in [`Relation::endpoints`]. Removing or
//! duplicating an entity walks that table, so a relation added later is
//! cascaded without touching the removal code.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::NetworkConfig;
use crate::index::IndexedVector;
use crate::matrix::{Matrix, MatrixProjector};
use crate::model::*;
use crate::storage::*;
use crate::{Error, Result};

// ============================================================================
// Relation dispatch table
// ============================================================================

/// Every two-mode network of the meta-network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    Interaction,
    Membership,
    ActorResource,
    ActorKnowledge,
    ActorBelief,
    ActorRole,
    ActorTask,
    ResourceTask,
    TaskKnowledge,
    OrganizationResource,
    ResourceResource,
}

/// Entity kinds a relation connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub source: Kind,
    pub target: Kind,
    pub scope: Option<Kind>,
}

impl Relation {
    pub const ALL: [Relation; 11] = [
        Relation::Interaction,
        Relation::Membership,
        Relation::ActorResource,
        Relation::ActorKnowledge,
        Relation::ActorBelief,
        Relation::ActorRole,
        Relation::ActorTask,
        Relation::ResourceTask,
        Relation::TaskKnowledge,
        Relation::OrganizationResource,
        Relation::ResourceResource,
    ];

    pub fn endpoints(&self) -> Endpoints {
        let (source, target, scope) = match self {
            Relation::Interaction => (Kind::Actor, Kind::Actor, None),
            Relation::Membership => (Kind::Actor, Kind::Organization, None),
            Relation::ActorResource => (Kind::Actor, Kind::Resource, None),
            Relation::ActorKnowledge => (Kind::Actor, Kind::Knowledge, None),
            Relation::ActorBelief => (Kind::Actor, Kind::Belief, None),
            Relation::ActorRole => (Kind::Actor, Kind::Role, Some(Kind::Organization)),
            Relation::ActorTask => (Kind::Actor, Kind::Task, None),
            Relation::ResourceTask => (Kind::Resource, Kind::Task, None),
            Relation::TaskKnowledge => (Kind::Task, Kind::Knowledge, None),
            Relation::OrganizationResource => (Kind::Organization, Kind::Resource, None),
            Relation::ResourceResource => (Kind::Resource, Kind::Resource, None),
        };
        Endpoints { source, target, scope }
    }

    /// Stored once per unordered pair.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Relation::Interaction)
    }

    /// Relations an entity of `kind` can appear in, with the role it plays.
    pub fn involving(kind: Kind) -> impl Iterator<Item = (Relation, Endpoints)> {
        Self::ALL
            .into_iter()
            .map(|r| (r, r.endpoints()))
            .filter(move |(_, ep)| ep.source == kind || ep.target == kind || ep.scope == Some(kind))
    }
}

/// Outcome of removing an entity from the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalStats {
    pub entities_removed: usize,
    pub edges_removed: usize,
}

// ============================================================================
// MetaNetwork
// ============================================================================

/// Organization meta-network.
///
/// Tables are public for direct reads and single-table writes. Writes with
/// effects on other tables (removal, organization membership, duplication)
/// must go through the methods below, which also serialize against each
/// other.
pub struct MetaNetwork {
    config: NetworkConfig,

    pub actors: EntityRegistry<ActorKind>,
    pub resources: EntityRegistry<ResourceKind>,
    pub knowledge: EntityRegistry<KnowledgeKind>,
    pub beliefs: EntityRegistry<BeliefKind>,
    pub organizations: EntityRegistry<OrganizationKind>,
    pub tasks: EntityRegistry<TaskKind>,
    pub events: EntityRegistry<EventKind>,
    pub roles: EntityRegistry<RoleKind>,

    pub interactions: InteractionTable,
    pub memberships: AllocationTable,
    pub actor_resources: AllocationTable,
    pub actor_knowledge: RelationTable<KnowledgeLink>,
    pub actor_beliefs: RelationTable<BeliefLink>,
    pub actor_roles: RelationTable<RoleLink>,
    pub actor_tasks: RelationTable<Link>,
    pub resource_tasks: RelationTable<Link>,
    pub task_knowledge: RelationTable<Link>,
    pub organization_resources: AllocationTable,
    pub resource_resources: RelationTable<Link>,

    writer: Mutex<()>,
}

impl Default for MetaNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaNetwork {
    pub fn new() -> Self {
        Self::with_config(NetworkConfig::default())
    }

    pub fn with_config(config: NetworkConfig) -> Self {
        Self {
            config,
            actors: EntityRegistry::new(Kind::Actor.default_class_id()),
            resources: EntityRegistry::new(Kind::Resource.default_class_id()),
            knowledge: EntityRegistry::new(Kind::Knowledge.default_class_id()),
            beliefs: EntityRegistry::new(Kind::Belief.default_class_id()),
            organizations: EntityRegistry::new(Kind::Organization.default_class_id()),
            tasks: EntityRegistry::new(Kind::Task.default_class_id()),
            events: EntityRegistry::new(Kind::Event.default_class_id()),
            roles: EntityRegistry::new(Kind::Role.default_class_id()),
            interactions: InteractionTable::new(),
            memberships: AllocationTable::new(),
            actor_resources: AllocationTable::new(),
            actor_knowledge: RelationTable::new(),
            actor_beliefs: RelationTable::new(),
            actor_roles: RelationTable::new(),
            actor_tasks: RelationTable::new(),
            resource_tasks: RelationTable::new(),
            task_knowledge: RelationTable::new(),
            organization_resources: AllocationTable::new(),
            resource_resources: RelationTable::new(),
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    pub fn registry(&self, kind: Kind) -> &dyn OneMode {
        match kind {
            Kind::Actor => &self.actors,
            Kind::Resource => &self.resources,
            Kind::Knowledge => &self.knowledge,
            Kind::Belief => &self.beliefs,
            Kind::Organization => &self.organizations,
            Kind::Task => &self.tasks,
            Kind::Event => &self.events,
            Kind::Role => &self.roles,
        }
    }

    pub fn relation(&self, relation: Relation) -> &dyn TwoMode {
        match relation {
            Relation::Interaction => &self.interactions,
            Relation::Membership => &self.memberships,
            Relation::ActorResource => &self.actor_resources,
            Relation::ActorKnowledge => &self.actor_knowledge,
            Relation::ActorBelief => &self.actor_beliefs,
            Relation::ActorRole => &self.actor_roles,
            Relation::ActorTask => &self.actor_tasks,
            Relation::ResourceTask => &self.resource_tasks,
            Relation::TaskKnowledge => &self.task_knowledge,
            Relation::OrganizationResource => &self.organization_resources,
            Relation::ResourceResource => &self.resource_resources,
        }
    }

    fn allocation_table(&self, relation: Relation) -> Option<&AllocationTable> {
        match relation {
            Relation::Membership => Some(&self.memberships),
            Relation::ActorResource => Some(&self.actor_resources),
            Relation::OrganizationResource => Some(&self.organization_resources),
            _ => None,
        }
    }

    pub fn exists(&self, kind: Kind, id: EntityId) -> bool {
        self.registry(kind).exists(id)
    }

    fn require(&self, kind: Kind, id: EntityId) -> Result<()> {
        if self.exists(kind, id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("{kind} {id}")))
        }
    }

    // ========================================================================
    // Edge insertion with endpoint checks
    // ========================================================================

    pub fn add_interaction(&self, a: EntityId, b: EntityId) -> Result<f32> {
        self.require(Kind::Actor, a)?;
        self.require(Kind::Actor, b)?;
        self.interactions.add_interaction(a, b)
    }

    pub fn add_actor_resource(&self, allocation: Allocation) -> Result<bool> {
        self.require(Kind::Actor, allocation.source)?;
        self.require(Kind::Resource, allocation.target)?;
        self.actor_resources.add(allocation)
    }

    pub fn add_organization_resource(&self, allocation: Allocation) -> Result<bool> {
        self.require(Kind::Organization, allocation.source)?;
        self.require(Kind::Resource, allocation.target)?;
        self.organization_resources.add(allocation)
    }

    pub fn add_knowledge(&self, actor: EntityId, knowledge: EntityId, value: f32) -> Result<bool> {
        self.require(Kind::Actor, actor)?;
        self.require(Kind::Knowledge, knowledge)?;
        self.actor_knowledge.add(KnowledgeLink::new(actor, knowledge, value))
    }

    pub fn add_belief(&self, actor: EntityId, belief: EntityId, value: f32) -> Result<bool> {
        if !(-1.0..=1.0).contains(&value) {
            return Err(Error::OutOfRange(format!("belief value must be within [-1, 1], got {value}")));
        }
        self.require(Kind::Actor, actor)?;
        self.require(Kind::Belief, belief)?;
        self.actor_beliefs.add(BeliefLink::new(actor, belief, value))
    }

    pub fn add_role(&self, actor: EntityId, role: EntityId, organization: EntityId) -> Result<bool> {
        self.require(Kind::Actor, actor)?;
        self.require(Kind::Role, role)?;
        self.require(Kind::Organization, organization)?;
        self.actor_roles.add(RoleLink::new(actor, role, organization))
    }

    pub fn assign_task(&self, actor: EntityId, task: EntityId) -> Result<bool> {
        self.require(Kind::Actor, actor)?;
        self.require(Kind::Task, task)?;
        self.actor_tasks.add(Link::unit(actor, task))
    }

    pub fn add_resource_task(&self, resource: EntityId, task: EntityId) -> Result<bool> {
        self.require(Kind::Resource, resource)?;
        self.require(Kind::Task, task)?;
        self.resource_tasks.add(Link::unit(resource, task))
    }

    pub fn add_task_knowledge(&self, task: EntityId, knowledge: EntityId) -> Result<bool> {
        self.require(Kind::Task, task)?;
        self.require(Kind::Knowledge, knowledge)?;
        self.task_knowledge.add(Link::unit(task, knowledge))
    }

    pub fn add_resource_resource(&self, source: EntityId, target: EntityId, weight: f32) -> Result<bool> {
        self.require(Kind::Resource, source)?;
        self.require(Kind::Resource, target)?;
        self.resource_resources.add(Link::new(source, target, weight))
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove an entity and every edge that references it.
    pub fn remove_entity(&self, kind: Kind, id: EntityId) -> Result<RemovalStats> {
        let _writer = self.writer.lock();
        self.remove_entity_locked(kind, id)
    }

    pub fn remove_actor(&self, actor: EntityId) -> Result<RemovalStats> {
        self.remove_entity(Kind::Actor, actor)
    }

    fn remove_entity_locked(&self, kind: Kind, id: EntityId) -> Result<RemovalStats> {
        self.require(kind, id)?;
        let mut stats = RemovalStats::default();
        for (relation, ep) in Relation::involving(kind) {
            let table = self.relation(relation);
            if ep.source == kind {
                stats.edges_removed += table.remove_source(id);
            }
            if ep.target == kind {
                stats.edges_removed += table.remove_target(id);
            }
            if ep.scope == Some(kind) {
                stats.edges_removed += table.remove_scope(id);
            }
        }
        stats.entities_removed = self.registry(kind).remove(id);
        tracing::debug!(kind = %kind, id = %id, edges = stats.edges_removed, "entity removed");
        Ok(stats)
    }

    // ========================================================================
    // Duplication
    // ========================================================================

    /// Register a copy of `id` under a fresh id and copy every relation it
    /// takes part in onto the copy. Allocation budgets touched by the new
    /// edges are rebalanced.
    pub fn duplicate_entity(&self, kind: Kind, id: EntityId) -> Result<EntityId> {
        let _writer = self.writer.lock();
        let copy = self.registry(kind).duplicate(id)?;
        for (relation, ep) in Relation::involving(kind) {
            let table = self.relation(relation);
            if ep.source == kind {
                table.copy_source_edges(id, copy);
            }
            if ep.target == kind && !relation.is_symmetric() {
                if table.copy_target_edges(id, copy) > 0 {
                    self.rebalance_sources_of(relation, copy)?;
                }
            }
            if ep.scope == Some(kind) {
                table.copy_scope_edges(id, copy);
            }
        }
        tracing::debug!(kind = %kind, original = %id, copy = %copy, "entity duplicated");
        Ok(copy)
    }

    fn rebalance_sources_of(&self, relation: Relation, target: EntityId) -> Result<()> {
        if let Some(table) = self.allocation_table(relation) {
            for source in table.sources(target) {
                table.update_allocations(source, Some(target.class_id), false)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Shift an existing allocation edge of `relation` by `delta`, never
    /// below the configured `allocation_floor` nor above 100. Returns the
    /// new allocation of the pair.
    pub fn update_allocation(&self, relation: Relation, source: EntityId, target: EntityId, delta: f32) -> Result<f32> {
        let table = self
            .allocation_table(relation)
            .ok_or_else(|| Error::InvalidArgument(format!("{relation:?} does not carry allocations")))?;
        table.update_allocation(source, target, delta, self.config.allocation_floor)
    }

    // ========================================================================
    // Organization membership
    // ========================================================================

    /// Actors belonging to `organization`.
    pub fn members(&self, organization: EntityId) -> Vec<EntityId> {
        self.memberships.sources(organization)
    }

    pub fn organizations_of(&self, actor: EntityId) -> Vec<EntityId> {
        self.memberships.targets(actor)
    }

    /// Organization the actor devotes most of its capacity to.
    pub fn main_organization(&self, actor: EntityId) -> Option<EntityId> {
        self.memberships.main_target(actor, Some(self.organizations.class_id()))
    }

    /// Make `actor` a member of `organization` with the given allocation.
    /// The actor inherits every resource the organization holds.
    pub fn add_actor_to_organization(&self, actor: EntityId, organization: EntityId, allocation: f32) -> Result<()> {
        let _writer = self.writer.lock();
        self.add_actor_to_organization_locked(actor, organization, allocation)
    }

    fn add_actor_to_organization_locked(&self, actor: EntityId, organization: EntityId, allocation: f32) -> Result<()> {
        self.require(Kind::Actor, actor)?;
        self.require(Kind::Organization, organization)?;
        self.memberships.add(Allocation::new(actor, organization, allocation))?;

        let mut inherited = 0;
        for held in self.organization_resources.edges_from(organization) {
            if self.actor_resources.add(held.with_source(actor))? {
                inherited += 1;
            }
        }
        tracing::debug!(actor = %actor, organization = %organization, allocation, inherited, "actor joined organization");
        Ok(())
    }

    /// Remove `actor` from `organization`.
    ///
    /// Interactions with the remaining members decay by the configured
    /// amount, roles held in the organization are dropped, and resources
    /// inherited from it are withdrawn unless another organization of the
    /// actor still provides them.
    pub fn remove_actor_from_organization(&self, actor: EntityId, organization: EntityId) -> Result<()> {
        let _writer = self.writer.lock();
        self.remove_actor_from_organization_locked(actor, organization)
    }

    fn remove_actor_from_organization_locked(&self, actor: EntityId, organization: EntityId) -> Result<()> {
        if !self.memberships.exists(actor, organization) {
            return Err(Error::NotFound(format!("membership {actor} -> {organization}")));
        }

        let decay = self.config.interaction_decay;
        for member in self.members(organization).into_iter().filter(|m| *m != actor) {
            self.interactions.decrease_interaction(actor, member, decay);
        }

        self.memberships.remove(actor, organization);
        self.actor_roles
            .retain(|r| !(r.actor == actor && r.organization == organization));

        let still_provided: Vec<EntityId> = self
            .organizations_of(actor)
            .into_iter()
            .flat_map(|org| self.organization_resources.targets(org))
            .collect();
        for resource in self.organization_resources.targets(organization) {
            if !still_provided.contains(&resource) {
                self.actor_resources.remove(actor, resource);
            }
        }
        tracing::debug!(actor = %actor, organization = %organization, "actor left organization");
        Ok(())
    }

    /// Move `actor` from one organization to another, keeping the
    /// allocation it had in the first. Fails without changing anything if
    /// the actor already belongs to `to`.
    pub fn transfer_actor(&self, actor: EntityId, from: EntityId, to: EntityId) -> Result<()> {
        let _writer = self.writer.lock();
        self.require(Kind::Organization, to)?;
        if self.memberships.exists(actor, to) {
            return Err(Error::InvalidArgument(format!("actor {actor} already belongs to {to}")));
        }
        let allocation = self.memberships.allocation(actor, from);
        self.remove_actor_from_organization_locked(actor, from)?;
        self.add_actor_to_organization_locked(actor, to, allocation)
    }

    // ========================================================================
    // Projection
    // ========================================================================

    /// Index of every registered entity of `kind`, sorted by id.
    pub fn index(&self, kind: Kind) -> IndexedVector<EntityId> {
        IndexedVector::new(self.registry(kind).ids())
    }

    /// Project a relation onto the registries of its endpoints.
    pub fn to_matrix(&self, relation: Relation) -> Result<Option<Matrix>> {
        let ep = relation.endpoints();
        let rows = self.index(ep.source);
        if relation.is_symmetric() {
            return MatrixProjector::project_symmetric(self.relation(relation), &rows);
        }
        let cols = self.index(ep.target);
        MatrixProjector::project(self.relation(relation), &rows, &cols)
    }
}
