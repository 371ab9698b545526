//! Two-mode network: weighted edges between two entity registries.
//!
//! Edges are kept in insertion order behind one `RwLock`, next to a
//! per-source and a per-target adjacency index of edge positions, so
//! lookups by endpoint never scan the whole table. The table also caches
//! its maximum edge weight; every mutation drops the cache and the next
//! normalized read recomputes it, so normalized weights can never be
//! stale.
//!
//! ```text
//! list:      [e0: a1->r1] [e1: a1->r2] [e2: a2->r1]
//! by_source: a1 -> [0, 1]   a2 -> [2]
//! by_target: r1 -> [0, 2]   r2 -> [1]
//! ```

use hashbrown::HashMap;
use parking_lot::{RwLock, RwLockUpgradableReadGuard, RwLockWriteGuard};
use smallvec::SmallVec;

use crate::model::*;
use crate::{Error, Result};
use super::TwoMode;

type Positions = SmallVec<[usize; 4]>;

/// Edge list plus its adjacency indices. Positions in the indices always
/// point into `list`; anything that reorders or drops edges reindexes.
pub(crate) struct Edges<E> {
    list: Vec<E>,
    by_source: HashMap<EntityId, Positions>,
    by_target: HashMap<EntityId, Positions>,
    max_weight: Option<f32>,
}

impl<E: Edge> Edges<E> {
    fn new() -> Self {
        Self {
            list: Vec::new(),
            by_source: HashMap::new(),
            by_target: HashMap::new(),
            max_weight: None,
        }
    }

    pub(crate) fn as_slice(&self) -> &[E] {
        &self.list
    }

    pub(crate) fn push(&mut self, edge: E) {
        let pos = self.list.len();
        self.by_source.entry(edge.source()).or_default().push(pos);
        self.by_target.entry(edge.target()).or_default().push(pos);
        self.list.push(edge);
    }

    pub(crate) fn from_source(&self, source: EntityId) -> impl Iterator<Item = &E> + '_ {
        self.by_source
            .get(&source)
            .into_iter()
            .flatten()
            .map(move |&i| &self.list[i])
    }

    pub(crate) fn to_target(&self, target: EntityId) -> impl Iterator<Item = &E> + '_ {
        self.by_target
            .get(&target)
            .into_iter()
            .flatten()
            .map(move |&i| &self.list[i])
    }

    pub(crate) fn between(&self, source: EntityId, target: EntityId) -> impl Iterator<Item = &E> + '_ {
        self.from_source(source).filter(move |e| e.target() == target)
    }

    fn position_of_key(&self, edge: &E) -> Option<usize> {
        self.by_source
            .get(&edge.source())?
            .iter()
            .copied()
            .find(|&i| self.list[i].same_key(edge))
    }

    pub(crate) fn contains_key(&self, edge: &E) -> bool {
        self.position_of_key(edge).is_some()
    }

    /// Apply `f` to every edge leaving `source`. `f` must leave the
    /// endpoints alone.
    pub(crate) fn for_each_from_mut(&mut self, source: EntityId, mut f: impl FnMut(&mut E)) {
        let Self { list, by_source, .. } = self;
        if let Some(positions) = by_source.get(&source) {
            for &i in positions {
                f(&mut list[i]);
            }
        }
    }

    fn retain(&mut self, keep: impl FnMut(&E) -> bool) -> usize {
        let before = self.list.len();
        self.list.retain(keep);
        let dropped = before - self.list.len();
        if dropped > 0 {
            self.reindex();
        }
        dropped
    }

    fn reindex(&mut self) {
        self.by_source.clear();
        self.by_target.clear();
        for (pos, e) in self.list.iter().enumerate() {
            self.by_source.entry(e.source()).or_default().push(pos);
            self.by_target.entry(e.target()).or_default().push(pos);
        }
    }

    fn clear(&mut self) {
        self.list.clear();
        self.by_source.clear();
        self.by_target.clear();
    }
}

/// Collection of directed, weighted edges of type `E`.
pub struct RelationTable<E: Edge> {
    inner: RwLock<Edges<E>>,
}

impl<E: Edge> Default for RelationTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Edge> RelationTable<E> {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Edges::new()) }
    }

    // ========================================================================
    // Lock helpers for the specialised tables
    // ========================================================================

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Edges<E>) -> R) -> R {
        f(&*self.inner.read())
    }

    /// Run `f` under the write lock. The normalization cache is dropped.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut Edges<E>) -> R) -> R {
        let mut inner = self.inner.write();
        inner.max_weight = None;
        f(&mut *inner)
    }

    /// Run `f` with the edges and the current maximum weight, computing
    /// and caching the maximum first if needed.
    fn normalized<R>(&self, f: impl FnOnce(&Edges<E>, f32) -> R) -> R {
        let guard = self.inner.upgradable_read();
        if let Some(max) = guard.max_weight {
            return f(&*guard, max);
        }
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        let max = max_weight_of(&guard.list);
        guard.max_weight = Some(max);
        let guard = RwLockWriteGuard::downgrade(guard);
        f(&*guard, max)
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert an edge. Returns `Ok(false)` without touching the table if an
    /// edge with the same key already exists.
    pub fn add(&self, edge: E) -> Result<bool> {
        check_weight(edge.weight())?;
        let mut inner = self.inner.write();
        if inner.contains_key(&edge) {
            return Ok(false);
        }
        tracing::trace!(source = %edge.source(), target = %edge.target(), weight = edge.weight(), "edge added");
        inner.push(edge);
        inner.max_weight = None;
        Ok(true)
    }

    /// Insert an edge, or add its weight onto the existing edge with the
    /// same key. Returns the resulting weight.
    pub fn accumulate(&self, edge: E) -> Result<f32> {
        check_weight(edge.weight())?;
        Ok(self.mutate(|edges| match edges.position_of_key(&edge) {
            Some(i) => {
                let existing = &mut edges.list[i];
                let weight = existing.weight() + edge.weight();
                existing.set_weight(weight);
                weight
            }
            None => {
                let weight = edge.weight();
                edges.push(edge);
                weight
            }
        }))
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn exists(&self, source: EntityId, target: EntityId) -> bool {
        self.read(|edges| edges.between(source, target).next().is_some())
    }

    pub fn has_source(&self, source: EntityId) -> bool {
        self.read(|edges| edges.by_source.contains_key(&source))
    }

    pub fn has_target(&self, target: EntityId) -> bool {
        self.read(|edges| edges.by_target.contains_key(&target))
    }

    /// First edge between the pair, in insertion order.
    pub fn get(&self, source: EntityId, target: EntityId) -> Option<E> {
        self.read(|edges| edges.between(source, target).next().cloned())
    }

    /// Every edge between the pair (several when the key is wider than the pair).
    pub fn edges_between(&self, source: EntityId, target: EntityId) -> SmallVec<[E; 2]> {
        self.read(|edges| edges.between(source, target).cloned().collect())
    }

    pub fn edges_from(&self, source: EntityId) -> Vec<E> {
        self.read(|edges| edges.from_source(source).cloned().collect())
    }

    pub fn edges_to(&self, target: EntityId) -> Vec<E> {
        self.read(|edges| edges.to_target(target).cloned().collect())
    }

    /// Edges leaving `source` whose target belongs to `target_class`.
    pub fn edges_from_filtered(&self, source: EntityId, target_class: ClassId) -> Vec<E> {
        self.read(|edges| {
            edges
                .from_source(source)
                .filter(|e| e.target().is_class(target_class))
                .cloned()
                .collect()
        })
    }

    /// Edges reaching `target` whose source belongs to `source_class`.
    pub fn edges_to_filtered(&self, target: EntityId, source_class: ClassId) -> Vec<E> {
        self.read(|edges| {
            edges
                .to_target(target)
                .filter(|e| e.source().is_class(source_class))
                .cloned()
                .collect()
        })
    }

    pub fn edges_in_scope(&self, scope: EntityId) -> Vec<E> {
        self.read(|edges| edges.list.iter().filter(|e| e.scope() == Some(scope)).cloned().collect())
    }

    /// Distinct targets of `source`, in first-seen order.
    pub fn targets(&self, source: EntityId) -> Vec<EntityId> {
        let mut out: Vec<EntityId> = Vec::new();
        self.read(|edges| {
            for e in edges.from_source(source) {
                if !out.contains(&e.target()) {
                    out.push(e.target());
                }
            }
        });
        out
    }

    /// Distinct sources of `target`, in first-seen order.
    pub fn sources(&self, target: EntityId) -> Vec<EntityId> {
        let mut out: Vec<EntityId> = Vec::new();
        self.read(|edges| {
            for e in edges.to_target(target) {
                if !out.contains(&e.source()) {
                    out.push(e.source());
                }
            }
        });
        out
    }

    /// Sum of the weights of every edge between the pair.
    pub fn weight(&self, source: EntityId, target: EntityId) -> f32 {
        self.read(|edges| edges.between(source, target).map(Edge::weight).sum())
    }

    /// Sum of the weights of every edge leaving `source`.
    pub fn weight_from(&self, source: EntityId) -> f32 {
        self.read(|edges| edges.from_source(source).map(Edge::weight).sum())
    }

    pub fn all(&self) -> Vec<E> {
        self.read(|edges| edges.list.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().list.is_empty()
    }

    // ========================================================================
    // Normalization
    // ========================================================================

    /// Recompute the maximum edge weight and return it (0 when empty).
    pub fn normalize_weights(&self) -> f32 {
        let mut inner = self.inner.write();
        let max = max_weight_of(&inner.list);
        inner.max_weight = Some(max);
        tracing::trace!(max, edges = inner.list.len(), "weights normalized");
        max
    }

    pub fn max_weight(&self) -> f32 {
        self.normalized(|_, max| max)
    }

    /// `weight(source, target) / max_weight`, or 0 when the table has no
    /// positive weight.
    pub fn normalized_weight(&self, source: EntityId, target: EntityId) -> f32 {
        self.normalized(|edges, max| {
            if max <= 0.0 {
                return 0.0;
            }
            let weight: f32 = edges.between(source, target).map(Edge::weight).sum();
            weight / max
        })
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Apply `f` to every edge between the pair. Fails if there is none.
    pub fn update(&self, source: EntityId, target: EntityId, mut f: impl FnMut(&mut E)) -> Result<usize> {
        self.mutate(|edges| {
            let positions: Positions = edges
                .by_source
                .get(&source)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&i| edges.list[i].target() == target)
                .collect();
            if positions.is_empty() {
                return Err(Error::NotFound(format!("edge {source} -> {target}")));
            }
            let mut moved = false;
            for &i in &positions {
                let e = &mut edges.list[i];
                f(e);
                moved |= e.source() != source || e.target() != target;
            }
            if moved {
                edges.reindex();
            }
            Ok(positions.len())
        })
    }

    pub fn remove(&self, source: EntityId, target: EntityId) -> usize {
        if !self.exists(source, target) {
            return 0;
        }
        self.retain(|e| !(e.source() == source && e.target() == target))
    }

    pub fn remove_source(&self, source: EntityId) -> usize {
        if !self.has_source(source) {
            return 0;
        }
        self.retain(|e| e.source() != source)
    }

    pub fn remove_target(&self, target: EntityId) -> usize {
        if !self.has_target(target) {
            return 0;
        }
        self.retain(|e| e.target() != target)
    }

    pub fn remove_scope(&self, scope: EntityId) -> usize {
        self.retain(|e| e.scope() != Some(scope))
    }

    /// Keep the edges matching `keep`; returns how many were dropped.
    pub fn retain(&self, keep: impl FnMut(&E) -> bool) -> usize {
        let mut inner = self.inner.write();
        let dropped = inner.retain(keep);
        if dropped > 0 {
            inner.max_weight = None;
        }
        dropped
    }

    /// Clone every edge touching `from` onto `to`. The opposite endpoint of
    /// each copied edge is left as is. Returns how many edges were added.
    pub fn copy_edges(&self, from: EntityId, to: EntityId) -> usize {
        self.copy_with(|edges| {
            edges
                .from_source(from)
                .map(|e| e.with_source(to))
                .chain(edges.to_target(from).map(|e| e.with_target(to)))
                .collect()
        })
    }

    pub fn copy_source_edges(&self, from: EntityId, to: EntityId) -> usize {
        self.copy_with(|edges| edges.from_source(from).map(|e| e.with_source(to)).collect())
    }

    pub fn copy_target_edges(&self, from: EntityId, to: EntityId) -> usize {
        self.copy_with(|edges| edges.to_target(from).map(|e| e.with_target(to)).collect())
    }

    pub fn copy_scope_edges(&self, from: EntityId, to: EntityId) -> usize {
        self.copy_with(|edges| {
            edges
                .list
                .iter()
                .filter(|e| e.scope() == Some(from))
                .map(|e| e.with_scope(to))
                .collect()
        })
    }

    fn copy_with(&self, derive: impl FnOnce(&Edges<E>) -> Vec<E>) -> usize {
        self.mutate(|edges| {
            let copies = derive(edges);
            let mut added = 0;
            for copy in copies {
                if !edges.contains_key(&copy) {
                    edges.push(copy);
                    added += 1;
                }
            }
            added
        })
    }

    pub fn clear(&self) {
        self.mutate(|edges| edges.clear());
    }
}

impl<E: Edge> TwoMode for RelationTable<E> {
    fn count(&self) -> usize {
        self.len()
    }

    fn triples(&self) -> Vec<(EntityId, EntityId, f32)> {
        self.read(|edges| edges.list.iter().map(|e| (e.source(), e.target(), e.weight())).collect())
    }

    fn touches(&self, id: EntityId) -> bool {
        self.read(|edges| {
            edges.by_source.contains_key(&id)
                || edges.by_target.contains_key(&id)
                || edges.list.iter().any(|e| e.scope() == Some(id))
        })
    }
    fn remove_source(&self, id: EntityId) -> usize {
        RelationTable::remove_source(self, id)
    }

    fn remove_target(&self, id: EntityId) -> usize {
        RelationTable::remove_target(self, id)
    }

    fn remove_scope(&self, id: EntityId) -> usize {
        RelationTable::remove_scope(self, id)
    }

    fn copy_source_edges(&self, from: EntityId, to: EntityId) -> usize {
        RelationTable::copy_source_edges(self, from, to)
    }

    fn copy_target_edges(&self, from: EntityId, to: EntityId) -> usize {
        RelationTable::copy_target_edges(self, from, to)
    }

    fn copy_scope_edges(&self, from: EntityId, to: EntityId) -> usize {
        RelationTable::copy_scope_edges(self, from, to)
    }
}

fn max_weight_of<E: Edge>(edges: &[E]) -> f32 {
    edges.iter().map(Edge::weight).fold(0.0_f32, f32::max)
}

fn check_weight(weight: f32) -> Result<()> {
    if weight.is_finite() {
        Ok(())
    } else {
        Err(Error::OutOfRange(format!("edge weight must be finite, got {weight}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(n: u16) -> EntityId {
        EntityId::new(n, 1)
    }

    fn r(n: u16) -> EntityId {
        EntityId::new(n, 2)
    }

    #[test]
    fn test_add_is_idempotent() {
        let t = RelationTable::new();
        assert!(t.add(Link::new(a(1), r(1), 2.0)).unwrap());
        assert!(!t.add(Link::new(a(1), r(1), 5.0)).unwrap());
        assert_eq!(t.len(), 1);
        assert_eq!(t.weight(a(1), r(1)), 2.0);
    }

    #[test]
    fn test_rejects_nan_weight() {
        let t = RelationTable::new();
        assert!(matches!(t.add(Link::new(a(1), r(1), f32::NAN)), Err(Error::OutOfRange(_))));
        assert!(t.is_empty());
    }

    #[test]
    fn test_weight_sums_multi_edges() {
        let t = RelationTable::new();
        t.add(Allocation::new(a(1), r(1), 30.0)).unwrap();
        t.add(Allocation::new(a(1), r(1), 20.0).with_usage(UsageTag(2))).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.weight(a(1), r(1)), 50.0);
        assert_eq!(t.edges_between(a(1), r(1)).len(), 2);
    }

    #[test]
    fn test_filters() {
        let t = RelationTable::new();
        t.add(Link::unit(a(1), r(1))).unwrap();
        t.add(Link::unit(a(1), EntityId::new(2, 9))).unwrap();
        t.add(Link::unit(a(2), r(1))).unwrap();
        assert_eq!(t.edges_from(a(1)).len(), 2);
        assert_eq!(t.edges_to(r(1)).len(), 2);
        assert_eq!(t.edges_from_filtered(a(1), ClassId(9)).len(), 1);
        assert_eq!(t.edges_to_filtered(r(1), ClassId(1)).len(), 2);
        assert_eq!(t.sources(r(1)), vec![a(1), a(2)]);
    }

    #[test]
    fn test_cascade_removal() {
        let t = RelationTable::new();
        t.add(Link::unit(a(1), r(1))).unwrap();
        t.add(Link::unit(a(1), r(2))).unwrap();
        t.add(Link::unit(a(2), r(2))).unwrap();
        assert_eq!(t.remove_source(a(1)), 2);
        assert!(!t.has_source(a(1)));
        assert_eq!(t.remove_target(r(2)), 1);
        assert!(t.is_empty());
    }

    #[test]
    fn test_normalized_weight_tracks_mutation() {
        let t = RelationTable::new();
        assert_eq!(t.normalize_weights(), 0.0);
        assert_eq!(t.normalized_weight(a(1), r(1)), 0.0);

        t.add(Link::new(a(1), r(1), 2.0)).unwrap();
        t.add(Link::new(a(2), r(1), 4.0)).unwrap();
        assert_eq!(t.normalized_weight(a(1), r(1)), 0.5);

        // A heavier edge added after a read must be reflected.
        t.add(Link::new(a(3), r(1), 8.0)).unwrap();
        assert_eq!(t.normalized_weight(a(1), r(1)), 0.25);
        assert_eq!(t.max_weight(), 8.0);
    }

    #[test]
    fn test_copy_edges_keeps_other_endpoint() {
        let t = RelationTable::new();
        t.add(Link::new(a(1), r(1), 3.0)).unwrap();
        t.add(Link::new(a(1), r(2), 1.0)).unwrap();
        assert_eq!(t.copy_edges(a(1), a(9)), 2);
        assert_eq!(t.weight(a(9), r(1)), 3.0);
        assert_eq!(t.weight(a(9), r(2)), 1.0);
        // Copying again adds nothing.
        assert_eq!(t.copy_edges(a(1), a(9)), 0);
    }

    #[test]
    fn test_update_missing_edge() {
        let t: RelationTable<Link> = RelationTable::new();
        assert!(matches!(t.update(a(1), r(1), |_| {}), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_scope_removal() {
        let t = RelationTable::new();
        let org = EntityId::new(1, 5);
        t.add(RoleLink::new(a(1), EntityId::new(1, 8), org)).unwrap();
        t.add(RoleLink::new(a(1), EntityId::new(1, 8), EntityId::new(2, 5))).unwrap();
        assert_eq!(t.edges_in_scope(org).len(), 1);
        assert_eq!(t.remove_scope(org), 1);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_adjacency_survives_removal() {
        let t = RelationTable::new();
        for n in 1..=50 {
            t.add(Link::new(a(n), r(n % 5), f32::from(n))).unwrap();
        }
        assert_eq!(t.remove_target(r(0)), 10);
        assert_eq!(t.remove(a(7), r(2)), 1);
        assert_eq!(t.len(), 39);
        assert!(!t.exists(a(7), r(2)));
        assert!(t.edges_from(a(5)).is_empty());
        assert_eq!(t.weight(a(8), r(3)), 8.0);
        assert_eq!(t.sources(r(2)).len(), 9);
        assert_eq!(t.targets(a(49)), vec![r(4)]);
        // Positions shifted by the removals must still resolve.
        t.update(a(49), r(4), |e| e.weight = 1.0).unwrap();
        assert_eq!(t.get(a(49), r(4)).unwrap().weight, 1.0);
        assert_eq!(t.max_weight(), 48.0);
    }

    #[test]
    fn test_update_moving_endpoint_reindexes() {
        let t = RelationTable::new();
        t.add(Link::new(a(1), r(1), 1.0)).unwrap();
        t.update(a(1), r(1), |e| e.target = r(2)).unwrap();
        assert!(!t.exists(a(1), r(1)));
        assert!(t.exists(a(1), r(2)));
        assert!(t.edges_to(r(1)).is_empty());
        assert_eq!(t.edges_to(r(2)).len(), 1);
    }
}
