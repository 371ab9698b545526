//! Network dump: the whole meta-network as plain serializable data.
//!
//! The dump keeps the minimum needed to rebuild every projection: the ids
//! registered per entity kind and the `(source, target, weight)` triples
//! of every relation. Entity attributes are not part of it.
//!
//! ```text
//! MetaNetwork ──dump()──► NetworkDump ──to_json()──► String / Write
//!                              │
//!                              └──to_matrix(relation)──► Matrix
//! ```

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::index::IndexedVector;
use crate::matrix::{Matrix, MatrixProjector};
use crate::meta::{MetaNetwork, Relation};
use crate::model::{EntityId, Kind};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryDump {
    pub kind: Kind,
    /// Sorted ascending.
    pub ids: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDump {
    pub relation: Relation,
    /// In insertion order.
    pub edges: Vec<(EntityId, EntityId, f32)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDump {
    pub registries: Vec<RegistryDump>,
    pub relations: Vec<RelationDump>,
}

impl NetworkDump {
    pub fn ids(&self, kind: Kind) -> &[EntityId] {
        self.registries
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.ids.as_slice())
            .unwrap_or_default()
    }

    pub fn edges(&self, relation: Relation) -> &[(EntityId, EntityId, f32)] {
        self.relations
            .iter()
            .find(|r| r.relation == relation)
            .map(|r| r.edges.as_slice())
            .unwrap_or_default()
    }

    pub fn edge_count(&self) -> usize {
        self.relations.iter().map(|r| r.edges.len()).sum()
    }

    /// Same projection as [`MetaNetwork::to_matrix`] at the time of the dump.
    pub fn to_matrix(&self, relation: Relation) -> Result<Option<Matrix>> {
        let ep = relation.endpoints();
        let rows = IndexedVector::new(self.ids(ep.source).iter().copied());
        let cols = IndexedVector::new(self.ids(ep.target).iter().copied());
        MatrixProjector::project_triples(self.edges(relation), &rows, &cols, relation.is_symmetric())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_json(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl MetaNetwork {
    pub fn dump(&self) -> NetworkDump {
        let registries = Kind::ALL
            .into_iter()
            .map(|kind| RegistryDump { kind, ids: self.registry(kind).ids() })
            .collect();
        let relations = Relation::ALL
            .into_iter()
            .map(|relation| RelationDump { relation, edges: self.relation(relation).triples() })
            .collect();
        let dump = NetworkDump { registries, relations };
        tracing::debug!(edges = dump.edge_count(), "network dumped");
        dump
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Allocation;
    use pretty_assertions::assert_eq;

    fn sample() -> MetaNetwork {
        let net = MetaNetwork::new();
        let a = net.actors.create().unwrap();
        let b = net.actors.create().unwrap();
        let org = net.organizations.create().unwrap();
        let r = net.resources.create().unwrap();
        net.add_interaction(a, b).unwrap();
        net.add_organization_resource(Allocation::new(org, r, 50.0)).unwrap();
        net.add_actor_to_organization(a, org, 100.0).unwrap();
        net
    }

    #[test]
    fn test_dump_lists_every_kind_and_relation() {
        let dump = sample().dump();
        assert_eq!(dump.registries.len(), Kind::ALL.len());
        assert_eq!(dump.relations.len(), Relation::ALL.len());
        assert_eq!(dump.ids(Kind::Actor).len(), 2);
        assert!(dump.ids(Kind::Event).is_empty());
        // interaction, org resource, membership, inherited resource
        assert_eq!(dump.edge_count(), 4);
    }

    #[test]
    fn test_dump_projects_like_network() {
        let net = sample();
        let dump = net.dump();
        for relation in Relation::ALL {
            assert_eq!(dump.to_matrix(relation).unwrap(), net.to_matrix(relation).unwrap());
        }
    }

    #[test]
    fn test_json_round_trip() {
        let dump = sample().dump();
        let json = dump.to_json().unwrap();
        assert_eq!(NetworkDump::from_json(&json).unwrap(), dump);

        let mut buf = Vec::new();
        dump.write_json(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), json);
    }
}
