//! Relation table → dense matrix.

use crate::index::IndexedVector;
use crate::model::EntityId;
use crate::storage::TwoMode;
use crate::{Error, Result};
use super::Matrix;

pub struct MatrixProjector;

impl MatrixProjector {
    /// Project `table` onto `rows × cols`.
    ///
    /// Returns `Ok(None)` when either index is empty. An edge whose endpoint
    /// is missing from its index means the indices are older than the table;
    /// that is reported as `Error::StaleIndex` rather than silently dropped.
    /// When several edges land on one cell the last one wins.
    pub fn project(
        table: &dyn TwoMode,
        rows: &IndexedVector<EntityId>,
        cols: &IndexedVector<EntityId>,
    ) -> Result<Option<Matrix>> {
        Self::project_triples(&table.triples(), rows, cols, false)
    }

    /// Like [`project`](Self::project), also writing each edge at the
    /// transposed cell. Used for symmetric relations stored once per pair.
    pub fn project_symmetric(
        table: &dyn TwoMode,
        index: &IndexedVector<EntityId>,
    ) -> Result<Option<Matrix>> {
        Self::project_triples(&table.triples(), index, index, true)
    }

    pub fn project_triples(
        triples: &[(EntityId, EntityId, f32)],
        rows: &IndexedVector<EntityId>,
        cols: &IndexedVector<EntityId>,
        symmetric: bool,
    ) -> Result<Option<Matrix>> {
        if rows.is_empty() || cols.is_empty() {
            return Ok(None);
        }
        let mut matrix = Matrix::zeros(rows.len(), cols.len());
        for &(source, target, weight) in triples {
            let r = rows
                .index_of(&source)
                .ok_or_else(|| Error::StaleIndex(format!("source {source} is not in the row index")))?;
            let c = cols
                .index_of(&target)
                .ok_or_else(|| Error::StaleIndex(format!("target {target} is not in the column index")))?;
            matrix.set(r, c, weight);
            if symmetric {
                matrix.set(c, r, weight);
            }
        }
        Ok(Some(matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Link;
    use crate::storage::RelationTable;

    fn a(n: u16) -> EntityId {
        EntityId::new(n, 1)
    }

    fn k(n: u16) -> EntityId {
        EntityId::new(n, 3)
    }

    #[test]
    fn test_round_trip() {
        let t = RelationTable::new();
        t.add(Link::new(a(1), k(2), 0.5)).unwrap();
        t.add(Link::new(a(3), k(4), 2.0)).unwrap();
        let rows = IndexedVector::new(vec![a(1), a(3)]);
        let cols = IndexedVector::new(vec![k(2), k(4)]);
        let m = MatrixProjector::project(&t, &rows, &cols).unwrap().unwrap();
        assert_eq!(m.get(0, 0), 0.5);
        assert_eq!(m.get(1, 1), 2.0);
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.get(1, 0), 0.0);
    }

    #[test]
    fn test_empty_index_gives_none() {
        let t: RelationTable<Link> = RelationTable::new();
        let rows = IndexedVector::new(vec![a(1)]);
        assert_eq!(MatrixProjector::project(&t, &rows, &IndexedVector::empty()).unwrap(), None);
    }

    #[test]
    fn test_stale_index_is_an_error() {
        let t = RelationTable::new();
        t.add(Link::unit(a(1), k(1))).unwrap();
        t.add(Link::unit(a(2), k(1))).unwrap();
        let rows = IndexedVector::new(vec![a(1)]);
        let cols = IndexedVector::new(vec![k(1)]);
        assert!(matches!(
            MatrixProjector::project(&t, &rows, &cols),
            Err(Error::StaleIndex(_))
        ));
    }

    #[test]
    fn test_symmetric() {
        let t = RelationTable::new();
        t.add(Link::new(a(1), a(2), 3.0)).unwrap();
        let idx = IndexedVector::new(vec![a(1), a(2)]);
        let m = MatrixProjector::project_symmetric(&t, &idx).unwrap().unwrap();
        assert_eq!(m.get(0, 1), 3.0);
        assert_eq!(m.get(1, 0), 3.0);
    }
}
