//! # metanet: Organization Meta-Network Store
//!
//! An in-memory meta-network of an organization: actors, resources,
//! knowledge, beliefs, organizations, tasks, events and roles, linked by
//! weighted two-mode relations. Relations project to dense matrices for
//! network metrics, and an interaction sphere scores how likely two actors
//! are to communicate.
//!
//! ## Design Principles
//!
//! 1. **Typed entities**: an actor registry cannot hold a resource
//! 2. **One table per relation**: each guarded by its own `RwLock`
//! 3. **Relation dispatch table**: removal, duplication and projection walk
//!    [`Relation::ALL`] instead of hand-listing tables
//! 4. **Metrics never fail on emptiness**: an empty projection is `None`,
//!    and every metric of `None` is 0
//!
//! ## Quick Start
//!
//! ```rust
//! use metanet::{metrics, Allocation, MetaNetwork, Relation};
//!
//! # fn main() -> metanet::Result<()> {
//! let net = MetaNetwork::new();
//! let ada = net.actors.create_named("Ada")?;
//! let bob = net.actors.create_named("Bob")?;
//! let lab = net.organizations.create_named("Lab")?;
//! let gpu = net.resources.create()?;
//!
//! net.add_organization_resource(Allocation::new(lab, gpu, 100.0))?;
//! net.add_actor_to_organization(ada, lab, 100.0)?;
//! net.add_interaction(ada, bob)?;
//!
//! assert!(net.actor_resources.exists(ada, gpu));
//! let m = net.to_matrix(Relation::Interaction)?;
//! assert_eq!(metrics::density(m.as_ref()), 0.5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | `model` | Ids, entities, edges, attribute values |
//! | `storage` | Registries and relation tables |
//! | `meta` | The `MetaNetwork` aggregate |
//! | `index` / `matrix` | Entity indices and dense projection |
//! | `metrics` | Density, load, degree centrality |
//! | `sphere` | Interaction sphere |
//! | `keyframe` | Snapshots over simulation time |
//! | `export` | JSON dump of a whole network |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod index;
pub mod matrix;
pub mod metrics;
pub mod config;
pub mod meta;
pub mod sphere;
pub mod keyframe;
pub mod export;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    EntityId, ClassId, Entity, EntityKind, Kind, Value, PropertyMap,
    Actor, Resource, Knowledge, Belief, Organization, Task, Event, Role,
    Edge, Link, Allocation, UsageTag, KnowledgeLink, BeliefLink, RoleLink,
};

// ============================================================================
// Re-exports: Storage and network
// ============================================================================

pub use storage::{
    EntityRegistry, RelationTable, AllocationTable, InteractionTable,
    OneMode, TwoMode, FULL_ALLOCATION,
};
pub use meta::{MetaNetwork, Relation, Endpoints, RemovalStats};
pub use config::{NetworkConfig, InteractionSphereModel};

// ============================================================================
// Re-exports: Analysis
// ============================================================================

pub use index::IndexedVector;
pub use matrix::{Matrix, MatrixProjector};
pub use sphere::{InteractionSphere, InteractionStrategy, SphereCell};
pub use keyframe::{KeyFrame, KeyFrameSeries, Snapshot, RelationSnapshot, AlignedSeries};
pub use export::{NetworkDump, RegistryDump, RelationDump};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Stale index: {0}")]
    StaleIndex(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
