//! Allocation table: two-mode network whose edges carry a percentage of
//! the source's capacity.
//!
//! Allocations toward targets of the same class are one budget. Whenever
//! an insert pushes a source's budget over 100, every edge of that budget
//! is scaled back proportionally: `new_i = old_i * 100 / total`.

use crate::model::*;
use crate::{Error, Result};
use super::relation::Edges;
use super::{RelationTable, TwoMode};

/// Upper bound of a source's budget toward one class of targets.
pub const FULL_ALLOCATION: f32 = 100.0;

pub struct AllocationTable {
    edges: RelationTable<Allocation>,
}

impl Default for AllocationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationTable {
    pub fn new() -> Self {
        Self { edges: RelationTable::new() }
    }

    /// Read access to the underlying edges.
    pub fn edges(&self) -> &RelationTable<Allocation> {
        &self.edges
    }

    /// Insert an allocation, rebalancing the source's budget if it now
    /// exceeds 100. Returns `Ok(false)` if the same (source, target, usage)
    /// edge already exists.
    pub fn add(&self, edge: Allocation) -> Result<bool> {
        check_allocation(edge.allocation)?;
        let class = edge.target.class_id;
        self.edges.mutate(|edges| {
            if edges.contains_key(&edge) {
                return Ok(false);
            }
            let source = edge.source;
            edges.push(edge);
            let total = budget_total(edges, source, Some(class));
            if total > FULL_ALLOCATION {
                tracing::warn!(source = %source, total, "allocation budget exceeded, rebalancing");
                rescale(edges, source, Some(class), total);
            }
            Ok(true)
        })
    }

    pub fn exists(&self, source: EntityId, target: EntityId) -> bool {
        self.edges.exists(source, target)
    }

    /// Sum of the allocations from `source` to `target` across usages.
    pub fn allocation(&self, source: EntityId, target: EntityId) -> f32 {
        self.edges.weight(source, target)
    }

    /// Sum of the allocations of `source`, optionally restricted to targets
    /// of one class.
    pub fn total_allocation(&self, source: EntityId, class_filter: Option<ClassId>) -> f32 {
        self.edges.read(|edges| budget_total(edges, source, class_filter))
    }

    pub fn edges_from(&self, source: EntityId) -> Vec<Allocation> {
        self.edges.edges_from(source)
    }

    pub fn edges_to(&self, target: EntityId) -> Vec<Allocation> {
        self.edges.edges_to(target)
    }

    pub fn sources(&self, target: EntityId) -> Vec<EntityId> {
        self.edges.sources(target)
    }

    pub fn targets(&self, source: EntityId) -> Vec<EntityId> {
        self.edges.targets(source)
    }

    /// Shift the allocation of an existing edge by `delta`, never below
    /// `floor` nor above 100. Returns the new allocation of the pair.
    pub fn update_allocation(&self, source: EntityId, target: EntityId, delta: f32, floor: f32) -> Result<f32> {
        if !delta.is_finite() {
            return Err(Error::OutOfRange(format!("allocation delta must be finite, got {delta}")));
        }
        check_allocation(floor)?;
        self.edges.update(source, target, |e| {
            e.allocation = (e.allocation + delta).max(floor).min(FULL_ALLOCATION);
        })?;
        Ok(self.allocation(source, target))
    }

    /// Rebalance the budget of `source`.
    ///
    /// Without `force_full`, a budget at or under 100 is left alone (the
    /// caller is still filling it in) and only an overflowing one is scaled
    /// back. With `force_full`, the budget is scaled to exactly 100, which
    /// requires a positive total.
    pub fn update_allocations(&self, source: EntityId, class_filter: Option<ClassId>, force_full: bool) -> Result<()> {
        self.edges.mutate(|edges| {
            let total = budget_total(edges, source, class_filter);
            if !force_full && total <= FULL_ALLOCATION {
                return Ok(());
            }
            if total <= 0.0 {
                return Err(Error::OutOfRange(format!(
                    "cannot rebalance allocations of {source}: total is {total}"
                )));
            }
            tracing::debug!(source = %source, total, force_full, "rebalancing allocations");
            rescale(edges, source, class_filter, total);
            Ok(())
        })
    }

    /// Target receiving the largest single allocation from `source`.
    /// Ties go to the lowest target id.
    pub fn main_target(&self, source: EntityId, class_filter: Option<ClassId>) -> Option<EntityId> {
        self.edges.read(|edges| {
            edges
                .from_source(source)
                .filter(|e| in_class(e, class_filter))
                .fold(None::<&Allocation>, |best, e| match best {
                    Some(b) if b.allocation > e.allocation => Some(b),
                    Some(b) if b.allocation == e.allocation && b.target <= e.target => Some(b),
                    _ => Some(e),
                })
                .map(|e| e.target)
        })
    }

    pub fn remove(&self, source: EntityId, target: EntityId) -> usize {
        self.edges.remove(source, target)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl TwoMode for AllocationTable {
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
        self.edges.remove_source(id)
    }

    fn remove_target(&self, id: EntityId) -> usize {
        self.edges.remove_target(id)
    }

    fn remove_scope(&self, id: EntityId) -> usize {
        self.edges.remove_scope(id)
    }

    fn copy_source_edges(&self, from: EntityId, to: EntityId) -> usize {
        self.edges.copy_source_edges(from, to)
    }

    fn copy_target_edges(&self, from: EntityId, to: EntityId) -> usize {
        self.edges.copy_target_edges(from, to)
    }

    fn copy_scope_edges(&self, from: EntityId, to: EntityId) -> usize {
        self.edges.copy_scope_edges(from, to)
    }
}

fn check_allocation(allocation: f32) -> Result<()> {
    if (0.0..=FULL_ALLOCATION).contains(&allocation) {
        Ok(())
    } else {
        Err(Error::OutOfRange(format!("allocation must be within [0, 100], got {allocation}")))
    }
}

fn in_class(e: &Allocation, class_filter: Option<ClassId>) -> bool {
    class_filter.map_or(true, |c| e.target.is_class(c))
}

fn budget_total(edges: &Edges<Allocation>, source: EntityId, class_filter: Option<ClassId>) -> f32 {
    edges
        .from_source(source)
        .filter(|e| in_class(e, class_filter))
        .map(|e| e.allocation)
        .sum()
}

fn rescale(edges: &mut Edges<Allocation>, source: EntityId, class_filter: Option<ClassId>, total: f32) {
    edges.for_each_from_mut(source, |e| {
        if in_class(e, class_filter) {
            e.allocation = (e.allocation * FULL_ALLOCATION / total).min(FULL_ALLOCATION);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn actor(n: u16) -> EntityId {
        EntityId::new(n, 1)
    }

    fn org(n: u16) -> EntityId {
        EntityId::new(n, 5)
    }

    #[test]
    fn test_rejects_out_of_range() {
        let t = AllocationTable::new();
        assert!(matches!(t.add(Allocation::new(actor(1), org(1), 120.0)), Err(Error::OutOfRange(_))));
        assert!(matches!(t.add(Allocation::new(actor(1), org(1), -1.0)), Err(Error::OutOfRange(_))));
        assert!(t.is_empty());
    }

    #[test]
    fn test_overflow_rebalances_proportionally() {
        let t = AllocationTable::new();
        t.add(Allocation::new(actor(1), org(1), 80.0)).unwrap();
        t.add(Allocation::new(actor(1), org(2), 80.0)).unwrap();
        assert_relative_eq!(t.allocation(actor(1), org(1)), 50.0);
        assert_relative_eq!(t.allocation(actor(1), org(2)), 50.0);
        assert_relative_eq!(t.total_allocation(actor(1), None), 100.0);
    }

    #[test]
    fn test_budget_is_per_target_class() {
        let t = AllocationTable::new();
        t.add(Allocation::new(actor(1), org(1), 70.0)).unwrap();
        t.add(Allocation::new(actor(1), EntityId::new(1, 2), 70.0)).unwrap();
        // Different target classes: no rebalance.
        assert_relative_eq!(t.allocation(actor(1), org(1)), 70.0);
        assert_relative_eq!(t.total_allocation(actor(1), Some(ClassId(5))), 70.0);
    }

    #[test]
    fn test_update_allocation_floor() {
        let t = AllocationTable::new();
        t.add(Allocation::new(actor(1), org(1), 40.0)).unwrap();
        assert_relative_eq!(t.update_allocation(actor(1), org(1), -50.0, 10.0).unwrap(), 10.0);
        assert_relative_eq!(t.update_allocation(actor(1), org(1), 200.0, 0.0).unwrap(), 100.0);
        assert!(matches!(
            t.update_allocation(actor(1), org(2), 1.0, 0.0),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_update_allocations_in_progress_is_noop() {
        let t = AllocationTable::new();
        t.add(Allocation::new(actor(1), org(1), 20.0)).unwrap();
        t.add(Allocation::new(actor(1), org(2), 30.0)).unwrap();
        t.update_allocations(actor(1), None, false).unwrap();
        assert_relative_eq!(t.total_allocation(actor(1), None), 50.0);
    }

    #[test]
    fn test_update_allocations_force_full() {
        let t = AllocationTable::new();
        t.add(Allocation::new(actor(1), org(1), 20.0)).unwrap();
        t.add(Allocation::new(actor(1), org(2), 30.0)).unwrap();
        t.update_allocations(actor(1), Some(ClassId(5)), true).unwrap();
        assert_relative_eq!(t.allocation(actor(1), org(1)), 40.0);
        assert_relative_eq!(t.allocation(actor(1), org(2)), 60.0);
    }

    #[test]
    fn test_force_full_on_zero_total_fails() {
        let t = AllocationTable::new();
        assert!(matches!(t.update_allocations(actor(1), None, true), Err(Error::OutOfRange(_))));
        t.add(Allocation::new(actor(1), org(1), 0.0)).unwrap();
        assert!(t.update_allocations(actor(1), None, true).is_err());
    }

    #[test]
    fn test_main_target_tie_breaks_on_lowest_id() {
        let t = AllocationTable::new();
        assert_eq!(t.main_target(actor(1), None), None);
        t.add(Allocation::new(actor(1), org(3), 40.0)).unwrap();
        t.add(Allocation::new(actor(1), org(2), 40.0)).unwrap();
        t.add(Allocation::new(actor(1), org(4), 20.0)).unwrap();
        assert_eq!(t.main_target(actor(1), None), Some(org(2)));
    }
}
