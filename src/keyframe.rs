//! # Keyframes
//!
//! A simulation records the meta-network at chosen time steps. Each
//! [`KeyFrame`] holds a [`Snapshot`]: every relation projected onto the
//! registries as they were at that step, with the indices that give the
//! matrix rows and columns their meaning.
//!
//! Entities appear and disappear between frames, so matrices of the same
//! relation generally differ in shape. [`KeyFrameSeries::align`] re-projects
//! them onto the union of all frames' indices, zero-padding entities a frame
//! did not have, so per-cell time series can be read directly.
//!
//! ```text
//!  frame 1: rows [a1 a2]      ─┐
//!  frame 5: rows [a1 a3]      ─┼─► union [a1 a2 a3] ─► one 3×N matrix per frame
//!  frame 9: rows [a2 a3 a4]   ─┘        (+ a4)
//! ```

use std::collections::BTreeMap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::index::IndexedVector;
use crate::matrix::{Matrix, MatrixProjector};
use crate::meta::{MetaNetwork, Relation};
use crate::model::EntityId;
use crate::{Error, Result};

/// One relation projected at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSnapshot {
    pub rows: IndexedVector<EntityId>,
    pub cols: IndexedVector<EntityId>,
    /// `None` when either index was empty.
    pub matrix: Option<Matrix>,
}

impl RelationSnapshot {
    fn positions(from: &IndexedVector<EntityId>, into: &IndexedVector<EntityId>) -> Vec<usize> {
        from.iter().filter_map(|id| into.index_of(id)).collect()
    }

    /// This snapshot's matrix placed onto larger indices. Every id of the
    /// snapshot's indices must be in `rows` / `cols`.
    fn embed(&self, rows: &IndexedVector<EntityId>, cols: &IndexedVector<EntityId>) -> Matrix {
        match &self.matrix {
            Some(m) => m.embed(
                rows.len(),
                cols.len(),
                &Self::positions(&self.rows, rows),
                &Self::positions(&self.cols, cols),
            ),
            None => Matrix::zeros(rows.len(), cols.len()),
        }
    }
}

/// Every relation of a network at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    relations: HashMap<Relation, RelationSnapshot>,
}

impl Snapshot {
    pub fn get(&self, relation: Relation) -> Option<&RelationSnapshot> {
        self.relations.get(&relation)
    }

    pub fn matrix(&self, relation: Relation) -> Option<&Matrix> {
        self.get(relation)?.matrix.as_ref()
    }

    pub fn insert(&mut self, relation: Relation, snapshot: RelationSnapshot) {
        self.relations.insert(relation, snapshot);
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

impl MetaNetwork {
    /// Project every relation onto the current registries.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::default();
        for relation in Relation::ALL {
            let ep = relation.endpoints();
            let rows = self.index(ep.source);
            let cols = if ep.source == ep.target { rows.clone() } else { self.index(ep.target) };
            let table = self.relation(relation);
            let matrix = if relation.is_symmetric() {
                MatrixProjector::project_symmetric(table, &rows)?
            } else {
                MatrixProjector::project(table, &rows, &cols)?
            };
            snapshot.insert(relation, RelationSnapshot { rows, cols, matrix });
        }
        Ok(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame {
    pub frame: u16,
    pub snapshot: Snapshot,
}

/// Matrices of one relation across frames, over shared indices.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub rows: IndexedVector<EntityId>,
    pub cols: IndexedVector<EntityId>,
    pub frames: Vec<(u16, Matrix)>,
}

impl AlignedSeries {
    /// Value of one cell over time. Ids outside the union yield `None`.
    pub fn cell(&self, source: EntityId, target: EntityId) -> Option<Vec<(u16, f32)>> {
        let r = self.rows.index_of(&source)?;
        let c = self.cols.index_of(&target)?;
        Some(self.frames.iter().map(|(f, m)| (*f, m.get(r, c))).collect())
    }
}

/// Keyframes ordered by frame number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFrameSeries {
    frames: BTreeMap<u16, KeyFrame>,
}

impl KeyFrameSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, keyframe: KeyFrame) -> Result<()> {
        if self.frames.contains_key(&keyframe.frame) {
            return Err(Error::ConstraintViolation(format!(
                "keyframe {} already recorded",
                keyframe.frame
            )));
        }
        self.frames.insert(keyframe.frame, keyframe);
        Ok(())
    }

    /// Snapshot `network` as frame `frame`.
    pub fn record(&mut self, frame: u16, network: &MetaNetwork) -> Result<()> {
        let snapshot = network.snapshot()?;
        self.add(KeyFrame { frame, snapshot })?;
        tracing::debug!(frame, "keyframe recorded");
        Ok(())
    }

    pub fn get(&self, frame: u16) -> Option<&KeyFrame> {
        self.frames.get(&frame)
    }

    pub fn frames(&self) -> impl Iterator<Item = &KeyFrame> {
        self.frames.values()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Project `relation` of every frame onto the union of all frames'
    /// indices. A frame without the relation contributes a zero matrix.
    pub fn align(&self, relation: Relation) -> AlignedSeries {
        let snapshots: Vec<(u16, Option<&RelationSnapshot>)> = self
            .frames
            .values()
            .map(|k| (k.frame, k.snapshot.get(relation)))
            .collect();
        let rows = IndexedVector::union(snapshots.iter().filter_map(|(_, s)| s.map(|s| &s.rows)));
        let cols = IndexedVector::union(snapshots.iter().filter_map(|(_, s)| s.map(|s| &s.cols)));
        let frames = snapshots
            .into_iter()
            .map(|(frame, s)| {
                let m = match s {
                    Some(s) => s.embed(&rows, &cols),
                    None => Matrix::zeros(rows.len(), cols.len()),
                };
                (frame, m)
            })
            .collect();
        AlignedSeries { rows, cols, frames }
    }

    /// Evaluate `metric` on `relation` at every frame.
    pub fn metric_series(&self, relation: Relation, metric: impl Fn(Option<&Matrix>) -> f32) -> Vec<(u16, f32)> {
        self.frames
            .values()
            .map(|k| (k.frame, metric(k.snapshot.matrix(relation))))
            .collect()
    }
}
