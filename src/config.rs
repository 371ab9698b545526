//! Network configuration.
//!
//! All settings deserialize from JSON with defaults for anything missing:
//!
//! ```rust
//! use metanet::NetworkConfig;
//!
//! let cfg = NetworkConfig::from_json(r#"{ "interaction_decay": 0.5 }"#).unwrap();
//! assert_eq!(cfg.interaction_decay, 0.5);
//! assert_eq!(cfg.sphere.max_sphere_weight(), 8.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Subtracted from the interaction weight between an actor and each
    /// co-member when the actor leaves an organization.
    pub interaction_decay: f32,
    /// Floor applied by [`MetaNetwork::update_allocation`](crate::MetaNetwork::update_allocation).
    pub allocation_floor: f32,
    pub sphere: InteractionSphereModel,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interaction_decay: 1.0,
            allocation_floor: 0.0,
            sphere: InteractionSphereModel::default(),
        }
    }
}

impl NetworkConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.interaction_decay >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "interaction_decay must be >= 0, got {}",
                self.interaction_decay
            )));
        }
        if !(0.0..=100.0).contains(&self.allocation_floor) {
            return Err(Error::InvalidConfig(format!(
                "allocation_floor must be within [0, 100], got {}",
                self.allocation_floor
            )));
        }
        self.sphere.validate()
    }
}

/// Which factors feed the interaction sphere, and how much each weighs.
///
/// A pair's sphere weight is
/// `social_proximity * social_proximity_weight + homophily * homophily_weight
/// + relative_activity * relative_activity_weight`, where homophily counts
/// the enabled sub-factors the pair shares (organization, knowledge, belief).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSphereModel {
    pub on: bool,
    /// When false, the sphere is frozen: no new interactions are proposed.
    pub sphere_update_over_time: bool,
    pub social_proximity_weight: f32,
    pub homophily_weight: f32,
    pub relative_activity_weight: f32,
    /// Organization co-membership counts toward homophily.
    pub social_demographic: bool,
    pub knowledge: bool,
    pub belief: bool,
}

impl Default for InteractionSphereModel {
    fn default() -> Self {
        Self {
            on: true,
            sphere_update_over_time: true,
            social_proximity_weight: 1.0,
            homophily_weight: 2.0,
            relative_activity_weight: 1.0,
            social_demographic: true,
            knowledge: true,
            belief: true,
        }
    }
}

impl InteractionSphereModel {
    pub fn homophily_factors(&self) -> u8 {
        self.social_demographic as u8 + self.knowledge as u8 + self.belief as u8
    }

    /// Largest weight a pair can reach under this model.
    pub fn max_sphere_weight(&self) -> f32 {
        self.social_proximity_weight
            + self.homophily_weight * self.homophily_factors() as f32
            + self.relative_activity_weight
    }

    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("social_proximity_weight", self.social_proximity_weight),
            ("homophily_weight", self.homophily_weight),
            ("relative_activity_weight", self.relative_activity_weight),
        ] {
            if !(w >= 0.0) || !w.is_finite() {
                return Err(Error::InvalidConfig(format!("{name} must be a finite value >= 0, got {w}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_max_sphere_weight() {
        assert_eq!(InteractionSphereModel::default().max_sphere_weight(), 8.0);
    }

    #[test]
    fn test_disabled_factors_shrink_max() {
        let model = InteractionSphereModel { belief: false, knowledge: false, ..Default::default() };
        assert_eq!(model.max_sphere_weight(), 4.0);
    }

    #[test]
    fn test_from_json_defaults() {
        let cfg = NetworkConfig::from_json("{}").unwrap();
        assert_eq!(cfg, NetworkConfig::default());
    }

    #[test]
    fn test_from_json_nested() {
        let cfg = NetworkConfig::from_json(r#"{ "sphere": { "belief": false } }"#).unwrap();
        assert!(!cfg.sphere.belief);
        assert!(cfg.sphere.knowledge);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            NetworkConfig::from_json(r#"{ "interaction_decay": -1.0 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            NetworkConfig::from_json(r#"{ "sphere": { "homophily_weight": -2.0 } }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(NetworkConfig::from_json("not json"), Err(Error::Json(_))));
    }
}
