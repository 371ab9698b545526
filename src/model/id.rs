//! Entity identifiers.

use serde::{Deserialize, Serialize};

/// Type tag of an entity class. Opaque to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ClassId(pub u8);

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Composite entity key: numeric id plus class tag.
///
/// Ordering is by `id` first, then `class_id` (field order matters for the
/// derived `Ord`). Matrix rows and columns follow this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub id: u16,
    pub class_id: ClassId,
}

impl EntityId {
    pub const fn new(id: u16, class_id: u8) -> Self {
        Self { id, class_id: ClassId(class_id) }
    }

    pub fn is_class(&self, class_id: ClassId) -> bool {
        self.class_id == class_id
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.id, self.class_id)
    }
}
