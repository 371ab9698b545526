//! # Interaction sphere
//!
//! Pairwise score telling the simulation how likely two actors are to
//! communicate. For every unordered pair of the actors handed to
//! [`InteractionSphere::set_sphere`] it combines:
//!
//! | Factor | Source | Range |
//! |--------|--------|-------|
//! | social proximity | normalized actor–actor interaction weight | `[0, 1]` |
//! | social demographic | share an organization | `{0, 1}` |
//! | relative knowledge | share a knowledge item at the same level | `{0, 1}` |
//! | relative belief | agreement of stances on shared beliefs | `{-1, 0, 1}` |
//! | relative activity | share a task | `{0, 1}` |
//!
//! Homophily is the count of enabled sub-factors (demographic, knowledge,
//! belief agreement) the pair has. The sphere weight is the weighted sum of
//! social proximity, homophily and activity, normalized by
//! [`InteractionSphereModel::max_sphere_weight`].
//!
//! The sphere is a per-decision-cycle snapshot: it is rebuilt on every
//! `set_sphere` call and never updated in place. Queries against a sphere
//! that has not been built return 0 or an empty list.

use serde::{Deserialize, Serialize};

use crate::config::InteractionSphereModel;
use crate::index::IndexedVector;
use crate::matrix::Matrix;
use crate::meta::MetaNetwork;
use crate::metrics::TOLERANCE;
use crate::model::*;

/// Criterion used to pick interaction partners from the sphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionStrategy {
    /// Any non-zero sphere weight.
    Sphere,
    Homophily,
    SocialDemographics,
    Knowledge,
    Beliefs,
    Activities,
}

/// Factors of one actor pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SphereCell {
    pub social_proximity: f32,
    pub social_demographic: f32,
    pub relative_knowledge: f32,
    pub relative_belief: f32,
    pub relative_activity: f32,
    pub homophily: f32,
    /// Weighted sum of the factors, not normalized.
    pub weight: f32,
    /// The pair already has a non-zero interaction.
    pub linked: bool,
}

impl SphereCell {
    fn passes(&self, strategy: InteractionStrategy) -> bool {
        let value = match strategy {
            InteractionStrategy::Sphere => self.weight,
            InteractionStrategy::Homophily => self.homophily,
            InteractionStrategy::SocialDemographics => self.social_demographic,
            InteractionStrategy::Knowledge => self.relative_knowledge,
            InteractionStrategy::Beliefs => self.relative_belief,
            InteractionStrategy::Activities => self.relative_activity,
        };
        value > 0.0
    }
}

struct Built {
    actors: IndexedVector<EntityId>,
    cells: Vec<SphereCell>,
}

impl Built {
    fn cell(&self, a: EntityId, b: EntityId) -> Option<&SphereCell> {
        let i = self.actors.index_of(&a)?;
        let j = self.actors.index_of(&b)?;
        if i == j {
            return None;
        }
        self.cells.get(i * self.actors.len() + j)
    }
}

pub struct InteractionSphere {
    model: InteractionSphereModel,
    built: Option<Built>,
}

impl InteractionSphere {
    pub fn new(model: InteractionSphereModel) -> Self {
        Self { model, built: None }
    }

    pub fn model(&self) -> &InteractionSphereModel {
        &self.model
    }

    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// Rebuild the sphere over `actors`. With `on == false`, or a model
    /// that is switched off, the sphere is cleared and stays unbuilt.
    pub fn set_sphere(&mut self, on: bool, actors: &[EntityId], network: &MetaNetwork) {
        if !(on && self.model.on) {
            self.built = None;
            return;
        }
        let index = IndexedVector::new(actors.iter().copied());
        let n = index.len();
        let profiles: Vec<Profile> = index.iter().map(|&a| Profile::of(network, a)).collect();
        let mut cells = vec![SphereCell::default(); n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (index.items()[i], index.items()[j]);
                let cell = self.score(network, (a, &profiles[i]), (b, &profiles[j]));
                cells[i * n + j] = cell;
                cells[j * n + i] = cell;
            }
        }
        tracing::debug!(actors = n, "interaction sphere built");
        self.built = Some(Built { actors: index, cells });
    }

    fn score(&self, network: &MetaNetwork, (a, pa): (EntityId, &Profile), (b, pb): (EntityId, &Profile)) -> SphereCell {
        let m = &self.model;
        let social_proximity = social_proximity(network, a, b);
        let social_demographic = indicator(shares(&pa.organizations, &pb.organizations));
        let relative_knowledge = indicator(same_level(&pa.knowledge, &pb.knowledge));
        let relative_belief = belief_vote(&pa.beliefs, &pb.beliefs);
        let relative_activity = indicator(shares(&pa.tasks, &pb.tasks));

        let mut homophily = 0.0;
        if m.social_demographic {
            homophily += social_demographic;
        }
        if m.knowledge {
            homophily += relative_knowledge;
        }
        if m.belief && relative_belief > 0.0 {
            homophily += 1.0;
        }

        let weight = social_proximity * m.social_proximity_weight
            + homophily * m.homophily_weight
            + relative_activity * m.relative_activity_weight;

        SphereCell {
            social_proximity,
            social_demographic,
            relative_knowledge,
            relative_belief,
            relative_activity,
            homophily,
            weight,
            linked: network.interactions.weight(a, b) > 0.0,
        }
    }

    pub fn max_sphere_weight(&self) -> f32 {
        self.model.max_sphere_weight()
    }

    /// Actors of the current sphere, in the order they were given.
    pub fn actors(&self) -> &[EntityId] {
        self.built.as_ref().map(|b| b.actors.items()).unwrap_or_default()
    }

    pub fn cell(&self, a: EntityId, b: EntityId) -> Option<SphereCell> {
        self.built.as_ref()?.cell(a, b).copied()
    }

    /// Sphere weight of the pair normalized to `[0, 1]`.
    pub fn weight(&self, a: EntityId, b: EntityId) -> f32 {
        let max = self.max_sphere_weight();
        if max <= TOLERANCE {
            return 0.0;
        }
        self.cell(a, b).map_or(0.0, |c| c.weight / max)
    }

    /// Actors whose pair with `actor` passes the strategy.
    pub fn get_agent_ids_for_interactions(&self, actor: EntityId, strategy: InteractionStrategy) -> Vec<EntityId> {
        self.partners(actor, strategy, false)
    }

    /// Like [`get_agent_ids_for_interactions`](Self::get_agent_ids_for_interactions),
    /// without the actors `actor` already interacts with. Always empty when
    /// the model freezes the sphere over time.
    pub fn get_agent_ids_for_new_interactions(&self, actor: EntityId, strategy: InteractionStrategy) -> Vec<EntityId> {
        if !self.model.sphere_update_over_time {
            return Vec::new();
        }
        self.partners(actor, strategy, true)
    }

    fn partners(&self, actor: EntityId, strategy: InteractionStrategy, only_new: bool) -> Vec<EntityId> {
        let Some(built) = &self.built else {
            return Vec::new();
        };
        built
            .actors
            .iter()
            .copied()
            .filter(|other| {
                built
                    .cell(actor, *other)
                    .is_some_and(|c| c.passes(strategy) && !(only_new && c.linked))
            })
            .collect()
    }

    /// Fraction of actor pairs with a non-zero sphere weight.
    pub fn density(&self) -> f32 {
        let Some(built) = &self.built else {
            return 0.0;
        };
        let n = built.actors.len();
        if n < 2 {
            return 0.0;
        }
        let linked = built.cells.iter().filter(|c| c.weight > 0.0).count();
        linked as f32 / (n * (n - 1)) as f32
    }

    /// Normalized weights as a square matrix over [`actors`](Self::actors).
    pub fn to_matrix(&self) -> Option<Matrix> {
        let built = self.built.as_ref()?;
        let n = built.actors.len();
        if n == 0 {
            return None;
        }
        let max = self.max_sphere_weight();
        let mut matrix = Matrix::zeros(n, n);
        if max > TOLERANCE {
            for i in 0..n {
                for j in 0..n {
                    if i != j {
                        matrix.set(i, j, built.cells[i * n + j].weight / max);
                    }
                }
            }
        }
        Some(matrix)
    }
}

// ============================================================================
// Pair factors
// ============================================================================

/// What the pair factors read about one actor, gathered once per rebuild.
struct Profile {
    organizations: Vec<EntityId>,
    knowledge: Vec<KnowledgeLink>,
    beliefs: Vec<BeliefLink>,
    tasks: Vec<EntityId>,
}

impl Profile {
    fn of(network: &MetaNetwork, actor: EntityId) -> Self {
        Self {
            organizations: network.organizations_of(actor),
            knowledge: network.actor_knowledge.edges_from(actor),
            beliefs: network.actor_beliefs.edges_from(actor),
            tasks: network.actor_tasks.targets(actor),
        }
    }
}

/// Normalized interaction weight between the two actors.
pub fn social_proximity(network: &MetaNetwork, a: EntityId, b: EntityId) -> f32 {
    network.interactions.normalized_weight(a, b)
}

/// 1 when the actors belong to at least one common organization.
pub fn social_demographic(network: &MetaNetwork, a: EntityId, b: EntityId) -> f32 {
    indicator(shares(&network.organizations_of(a), &network.organizations_of(b)))
}

/// 1 when the actors hold at least one knowledge item at the same level.
pub fn relative_knowledge(network: &MetaNetwork, a: EntityId, b: EntityId) -> f32 {
    indicator(same_level(
        &network.actor_knowledge.edges_from(a),
        &network.actor_knowledge.edges_from(b),
    ))
}

/// Agreement on shared beliefs: each shared belief votes `+1` when both
/// stances have the same sign, `-1` when they oppose, and nothing when
/// either stance is exactly 0. The result is the sign of the vote.
pub fn relative_belief(network: &MetaNetwork, a: EntityId, b: EntityId) -> f32 {
    belief_vote(
        &network.actor_beliefs.edges_from(a),
        &network.actor_beliefs.edges_from(b),
    )
}

/// 1 when the actors are assigned to at least one common task.
pub fn relative_activity(network: &MetaNetwork, a: EntityId, b: EntityId) -> f32 {
    indicator(shares(&network.actor_tasks.targets(a), &network.actor_tasks.targets(b)))
}

fn shares(mine: &[EntityId], theirs: &[EntityId]) -> bool {
    theirs.iter().any(|t| mine.contains(t))
}

fn same_level(mine: &[KnowledgeLink], theirs: &[KnowledgeLink]) -> bool {
    mine.iter().any(|m| {
        theirs
            .iter()
            .any(|t| t.knowledge == m.knowledge && (t.value - m.value).abs() <= TOLERANCE)
    })
}

fn belief_vote(mine: &[BeliefLink], theirs: &[BeliefLink]) -> f32 {
    let mut vote = 0.0_f32;
    for m in mine {
        for t in theirs.iter().filter(|t| t.belief == m.belief) {
            if m.value != 0.0 && t.value != 0.0 {
                vote += (m.value * t.value).signum();
            }
        }
    }
    if vote > 0.0 {
        1.0
    } else if vote < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn indicator(flag: bool) -> f32 {
    if flag { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_with(n: usize) -> (MetaNetwork, Vec<EntityId>) {
        let net = MetaNetwork::new();
        let actors = (0..n).map(|_| net.actors.create().unwrap()).collect();
        (net, actors)
    }

    #[test]
    fn test_unbuilt_sphere_returns_defaults() {
        let sphere = InteractionSphere::new(InteractionSphereModel::default());
        let a = EntityId::new(1, 1);
        assert!(!sphere.is_built());
        assert_eq!(sphere.weight(a, EntityId::new(2, 1)), 0.0);
        assert!(sphere.get_agent_ids_for_interactions(a, InteractionStrategy::Homophily).is_empty());
        assert_eq!(sphere.density(), 0.0);
        assert!(sphere.to_matrix().is_none());
    }

    #[test]
    fn test_off_clears() {
        let (net, actors) = network_with(2);
        let mut sphere = InteractionSphere::new(InteractionSphereModel::default());
        sphere.set_sphere(true, &actors, &net);
        assert!(sphere.is_built());
        sphere.set_sphere(false, &actors, &net);
        assert!(!sphere.is_built());
    }

    #[test]
    fn test_switched_off_model_never_builds() {
        let (net, actors) = network_with(2);
        let model = InteractionSphereModel { on: false, ..Default::default() };
        let mut sphere = InteractionSphere::new(model);
        sphere.set_sphere(true, &actors, &net);
        assert!(!sphere.is_built());
        assert!(sphere.actors().is_empty());
    }

    #[test]
    fn test_cells_agree_with_pair_factors() {
        let (net, actors) = network_with(4);
        let org = net.organizations.create().unwrap();
        let k = net.knowledge.create().unwrap();
        let b = net.beliefs.create().unwrap();
        let t = net.tasks.create().unwrap();
        net.add_actor_to_organization(actors[0], org, 50.0).unwrap();
        net.add_actor_to_organization(actors[2], org, 50.0).unwrap();
        net.add_knowledge(actors[1], k, 0.3).unwrap();
        net.add_knowledge(actors[2], k, 0.3).unwrap();
        net.add_belief(actors[0], b, 0.4).unwrap();
        net.add_belief(actors[3], b, -0.4).unwrap();
        net.assign_task(actors[1], t).unwrap();
        net.assign_task(actors[3], t).unwrap();
        net.add_interaction(actors[0], actors[3]).unwrap();

        let mut sphere = InteractionSphere::new(InteractionSphereModel::default());
        sphere.set_sphere(true, &actors, &net);
        for &x in &actors {
            for &y in actors.iter().filter(|&&y| y != x) {
                let cell = sphere.cell(x, y).unwrap();
                assert_eq!(cell.social_proximity, social_proximity(&net, x, y));
                assert_eq!(cell.social_demographic, social_demographic(&net, x, y));
                assert_eq!(cell.relative_knowledge, relative_knowledge(&net, x, y));
                assert_eq!(cell.relative_belief, relative_belief(&net, x, y));
                assert_eq!(cell.relative_activity, relative_activity(&net, x, y));
            }
        }
        assert_eq!(sphere.cell(actors[0], actors[3]).unwrap().relative_belief, -1.0);
        assert!(sphere.cell(actors[0], actors[3]).unwrap().linked);
    }

    #[test]
    fn test_belief_signs() {
        let (net, actors) = network_with(3);
        let b = net.beliefs.create().unwrap();
        net.add_belief(actors[0], b, 0.5).unwrap();
        net.add_belief(actors[1], b, 0.9).unwrap();
        net.add_belief(actors[2], b, -0.2).unwrap();
        assert_eq!(relative_belief(&net, actors[0], actors[1]), 1.0);
        assert_eq!(relative_belief(&net, actors[0], actors[2]), -1.0);

        let other = net.beliefs.create().unwrap();
        let (x, y) = (net.actors.create().unwrap(), net.actors.create().unwrap());
        net.add_belief(x, other, 0.0).unwrap();
        net.add_belief(y, other, 1.0).unwrap();
        assert_eq!(relative_belief(&net, x, y), 0.0);
    }

    #[test]
    fn test_knowledge_requires_same_level() {
        let (net, actors) = network_with(3);
        let k = net.knowledge.create().unwrap();
        net.add_knowledge(actors[0], k, 0.5).unwrap();
        net.add_knowledge(actors[1], k, 0.5).unwrap();
        net.add_knowledge(actors[2], k, 0.7).unwrap();
        assert_eq!(relative_knowledge(&net, actors[0], actors[1]), 1.0);
        assert_eq!(relative_knowledge(&net, actors[0], actors[2]), 0.0);
    }

    #[test]
    fn test_disabled_factor_does_not_count() {
        let (net, actors) = network_with(2);
        let k = net.knowledge.create().unwrap();
        net.add_knowledge(actors[0], k, 1.0).unwrap();
        net.add_knowledge(actors[1], k, 1.0).unwrap();

        let model = InteractionSphereModel { knowledge: false, ..Default::default() };
        let mut sphere = InteractionSphere::new(model);
        sphere.set_sphere(true, &actors, &net);
        let cell = sphere.cell(actors[0], actors[1]).unwrap();
        assert_eq!(cell.relative_knowledge, 1.0);
        assert_eq!(cell.homophily, 0.0);
        assert_eq!(cell.weight, 0.0);
    }

    #[test]
    fn test_frozen_sphere_proposes_nothing_new() {
        let (net, actors) = network_with(2);
        let t = net.tasks.create().unwrap();
        net.assign_task(actors[0], t).unwrap();
        net.assign_task(actors[1], t).unwrap();

        let model = InteractionSphereModel { sphere_update_over_time: false, ..Default::default() };
        let mut sphere = InteractionSphere::new(model);
        sphere.set_sphere(true, &actors, &net);
        assert_eq!(
            sphere.get_agent_ids_for_interactions(actors[0], InteractionStrategy::Activities),
            vec![actors[1]]
        );
        assert!(sphere
            .get_agent_ids_for_new_interactions(actors[0], InteractionStrategy::Activities)
            .is_empty());
    }
}
