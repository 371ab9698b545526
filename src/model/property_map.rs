//! PropertyMap: the attribute bag on entities.

use std::collections::HashMap;
use super::Value;

/// A map of attribute names to values.
pub type PropertyMap = HashMap<String, Value>;
