//! Attribute values carried on entities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Simulation attribute value.
///
/// Entities keep their domain attributes (skill level, cost, risk
/// aversion, ...) as a loose property bag; the network itself never
/// interprets them. Serialized untagged, so attributes read as plain JSON:
/// `{"skill": 0.8, "senior": true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric value as `f64`; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Numeric value narrowed to the `f32` the tables store, if it is
    /// finite after narrowing.
    pub fn as_weight(&self) -> Option<f32> {
        self.as_float().map(|f| f as f32).filter(|w| w.is_finite())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v.into()) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f32> for Value { fn from(v: f32) -> Self { Value::Float(v.into()) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("risk"), Value::String("risk".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(0.5f64), Value::Float(0.5));
        assert_eq!(Value::from(vec![true]), Value::List(vec![Value::Bool(true)]));
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Float(0.25).as_weight(), Some(0.25));
        assert_eq!(Value::Float(1e300).as_weight(), None);
        assert_eq!(Value::Bool(true).as_float(), None);
    }

    #[test]
    fn test_untagged_json() {
        let attrs: HashMap<String, Value> =
            serde_json::from_str(r#"{ "skill": 0.8, "level": 3, "senior": true, "team": null }"#).unwrap();
        assert_eq!(attrs["skill"], Value::Float(0.8));
        assert_eq!(attrs["level"], Value::Int(3));
        assert_eq!(attrs["senior"].as_bool(), Some(true));
        assert!(attrs["team"].is_null());
    }
}
