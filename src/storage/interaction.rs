//! Actor–actor interactions.
//!
//! The relation is symmetric: the pair is stored once with
//! `source < target`, and the weight counts how many times the two actors
//! interacted.

use crate::model::*;
use crate::{Error, Result};
use super::{RelationTable, TwoMode};

pub struct InteractionTable {
    edges: RelationTable<Link>,
}

impl Default for InteractionTable {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl InteractionTable {
    pub fn new() -> Self {
        Self { edges: RelationTable::new() }
    }

    pub fn edges(&self) -> &RelationTable<Link> {
        &self.edges
    }

    /// Record one interaction between `a` and `b`. Returns the new count.
    pub fn add_interaction(&self, a: EntityId, b: EntityId) -> Result<f32> {
        self.add_interaction_weighted(a, b, 1.0)
    }

    pub fn add_interaction_weighted(&self, a: EntityId, b: EntityId, weight: f32) -> Result<f32> {
        if a == b {
            return Err(Error::InvalidArgument(format!("actor {a} cannot interact with itself")));
        }
        if weight < 0.0 {
            return Err(Error::OutOfRange(format!("interaction weight must be >= 0, got {weight}")));
        }
        let (source, target) = canonical(a, b);
        self.edges.accumulate(Link::new(source, target, weight))
    }

    /// Lower the weight between `a` and `b` by `decrement`, flooring at 0.
    /// The link itself survives. Returns the new weight, or 0 if the two
    /// actors were never linked.
    pub fn decrease_interaction(&self, a: EntityId, b: EntityId, decrement: f32) -> f32 {
        let (source, target) = canonical(a, b);
        let mut weight = 0.0;
        match self.edges.update(source, target, |e| {
            e.weight = (e.weight - decrement).max(0.0);
            weight = e.weight;
        }) {
            Ok(_) => weight,
            Err(_) => 0.0,
        }
    }

    pub fn exists(&self, a: EntityId, b: EntityId) -> bool {
        let (source, target) = canonical(a, b);
        self.edges.exists(source, target)
    }

    pub fn weight(&self, a: EntityId, b: EntityId) -> f32 {
        let (source, target) = canonical(a, b);
        self.edges.weight(source, target)
    }

    pub fn normalized_weight(&self, a: EntityId, b: EntityId) -> f32 {
        let (source, target) = canonical(a, b);
        self.edges.normalized_weight(source, target)
    }

    /// Refresh the maximum interaction count used for normalization.
    pub fn set_max_links_count(&self) -> f32 {
        self.edges.normalize_weights()
    }

    pub fn max_links_count(&self) -> f32 {
        self.edges.max_weight()
    }

    /// Actors linked to `actor` by a non-zero weight.
    pub fn linked_actors(&self, actor: EntityId) -> Vec<EntityId> {
        self.edges.read(|edges| {
            edges
                .from_source(actor)
                .map(|e| (e.target, e.weight))
                .chain(edges.to_target(actor).map(|e| (e.source, e.weight)))
                .filter(|&(_, weight)| weight > 0.0)
                .map(|(other, _)| other)
                .collect()
        })
    }

    pub fn remove_actor(&self, actor: EntityId) -> usize {
        self.edges.retain(|e| !e.touches(actor))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl TwoMode for InteractionTable {
    fn count(&self) -> usize {
        self.edges.len()
    }

    fn triples(&self) -> Vec<(EntityId, EntityId, f32)> {
        self.edges.triples()
    }

    fn touches(&self, id: EntityId) -> bool {
        TwoMode::touches(&self.edges, id)
    }

    fn remove_source(&self, id: EntityId) -> usize {
        self.remove_actor(id)
    }

    fn remove_target(&self, id: EntityId) -> usize {
        self.remove_actor(id)
    }

    fn remove_scope(&self, _id: EntityId) -> usize {
        0
    }

    /// Copies keep the canonical order of each pair.
    fn copy_source_edges(&self, from: EntityId, to: EntityId) -> usize {
        let links: Vec<(EntityId, f32)> = self.edges.read(|edges| {
            edges
                .from_source(from)
                .map(|e| (e.target, e.weight))
                .chain(edges.to_target(from).map(|e| (e.source, e.weight)))
                .collect()
        });
        let mut added = 0;
        for (other, weight) in links {
            if other == to {
                continue;
            }
            let (source, target) = canonical(to, other);
            if matches!(self.edges.add(Link::new(source, target, weight)), Ok(true)) {
                added += 1;
            }
        }
        added
    }

    fn copy_target_edges(&self, from: EntityId, to: EntityId) -> usize {
        self.copy_source_edges(from, to)
    }

    fn copy_scope_edges(&self, _from: EntityId, _to: EntityId) -> usize {
        0
    }
}
