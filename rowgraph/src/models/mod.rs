//! Value models shared by every stage of the pipeline.
//!
//! - [`LeafValue`] - Scalar (or split array) value stored at a flat path
//! - [`CompositeKey`] - Identity of a list element or a root-key group
//! - [`Row`] / [`RowValues`] - One input row before / after value transformation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// One input row: flat path -> raw value.
pub type Row = IndexMap<String, LeafValue>;

/// One row after value transformation: flat path -> typed leaf.
pub type RowValues = IndexMap<String, LeafValue>;

// =============================================================================
// Leaf Value
// =============================================================================

/// A leaf of the document tree.
///
/// Input rows only carry scalars; `Array` is produced by primitive splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum LeafValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<LeafValue>),
}

/// Numeric view of a leaf, used for ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    /// Total order over numbers; NaN never reaches here.
    pub fn compare(self, other: Numeric) -> Ordering {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
        }
    }
}

impl LeafValue {
    pub fn is_null(&self) -> bool {
        matches!(self, LeafValue::Null)
    }

    /// True for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        matches!(self, LeafValue::Text(s) if s.trim().is_empty())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, LeafValue::Array(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LeafValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numbers, and text that reads as a finite number.
    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            LeafValue::Int(i) => Some(Numeric::Int(*i)),
            LeafValue::Float(f) if f.is_finite() => Some(Numeric::Float(*f)),
            LeafValue::Text(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    return Some(Numeric::Int(i));
                }
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Numeric::Float)
            }
            LeafValue::Null | LeafValue::Bool(_) | LeafValue::Float(_) | LeafValue::Array(_) => None,
        }
    }

    /// Text form used for lexicographic comparison.
    pub fn sort_text(&self) -> Cow<'_, str> {
        match self {
            LeafValue::Null => Cow::Borrowed(""),
            LeafValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            LeafValue::Int(i) => Cow::Owned(i.to_string()),
            LeafValue::Float(f) => Cow::Owned(f.to_string()),
            LeafValue::Text(s) => Cow::Borrowed(s),
            LeafValue::Array(items) => Cow::Owned(
                items
                    .iter()
                    .map(|item| item.sort_text().into_owned())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

impl std::fmt::Display for LeafValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", serde_json::Value::from(self.clone()))
    }
}

impl TryFrom<serde_json::Value> for LeafValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => LeafValue::Null,
            Value::Bool(b) => LeafValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => LeafValue::Int(i),
                None => LeafValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => LeafValue::Text(s),
            Value::Array(items) => LeafValue::Array(
                items
                    .into_iter()
                    .map(LeafValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(_) => {
                return Err("nested objects are not valid row values; flatten them into paths".to_string())
            }
        })
    }
}

impl From<LeafValue> for serde_json::Value {
    fn from(value: LeafValue) -> Self {
        use serde_json::Value;

        match value {
            LeafValue::Null => Value::Null,
            LeafValue::Bool(b) => Value::Bool(b),
            LeafValue::Int(i) => Value::from(i),
            LeafValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            LeafValue::Text(s) => Value::String(s),
            LeafValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
        }
    }
}

impl From<&str> for LeafValue {
    fn from(s: &str) -> Self {
        LeafValue::Text(s.to_string())
    }
}

impl From<String> for LeafValue {
    fn from(s: String) -> Self {
        LeafValue::Text(s)
    }
}

impl From<i64> for LeafValue {
    fn from(i: i64) -> Self {
        LeafValue::Int(i)
    }
}

impl From<i32> for LeafValue {
    fn from(i: i32) -> Self {
        LeafValue::Int(i64::from(i))
    }
}

impl From<f64> for LeafValue {
    fn from(f: f64) -> Self {
        LeafValue::Float(f)
    }
}

impl From<bool> for LeafValue {
    fn from(b: bool) -> Self {
        LeafValue::Bool(b)
    }
}

impl<T: Into<LeafValue>> From<Option<T>> for LeafValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(LeafValue::Null)
    }
}

// =============================================================================
// Composite Key
// =============================================================================

/// Hashable projection of a leaf. Floats hash by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyAtom {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    Array(Vec<KeyAtom>),
}

impl KeyAtom {
    fn of(value: &LeafValue) -> Self {
        match value {
            LeafValue::Null => KeyAtom::Null,
            LeafValue::Bool(b) => KeyAtom::Bool(*b),
            LeafValue::Int(i) => KeyAtom::Int(*i),
            // -0.0 and 0.0 are the same identity
            LeafValue::Float(f) if *f == 0.0 => KeyAtom::Float(0.0f64.to_bits()),
            LeafValue::Float(f) => KeyAtom::Float(f.to_bits()),
            LeafValue::Text(s) => KeyAtom::Text(s.clone()),
            LeafValue::Array(items) => KeyAtom::Array(items.iter().map(KeyAtom::of).collect()),
        }
    }
}

/// Ordered tuple of leaf values identifying one logical entity.
///
/// Equality and hashing are by value, so keys built from different rows with
/// the same field values address the same element.
#[derive(Debug, Clone)]
pub struct CompositeKey {
    values: Vec<LeafValue>,
    atoms: Vec<KeyAtom>,
}

impl CompositeKey {
    pub fn new(values: Vec<LeafValue>) -> Self {
        let atoms = values.iter().map(KeyAtom::of).collect();
        Self { values, atoms }
    }

    /// The empty key (single implicit group / keyless list).
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn values(&self) -> &[LeafValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<LeafValue> {
        self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for CompositeKey {
    fn eq(&self, other: &Self) -> bool {
        self.atoms == other.atoms
    }
}

impl Eq for CompositeKey {}

impl Hash for CompositeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.atoms.hash(state);
    }
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.values.as_slice() {
            [] => f.write_str("<all rows>"),
            [single] => write!(f, "{}", single),
            many => {
                let parts: Vec<String> = many.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_leaf_from_json_preserves_kind() {
        let leaf: LeafValue = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(leaf, LeafValue::Int(42));

        let leaf: LeafValue = serde_json::from_value(json!(1.5)).unwrap();
        assert_eq!(leaf, LeafValue::Float(1.5));

        let leaf: LeafValue = serde_json::from_value(json!("x")).unwrap();
        assert_eq!(leaf, LeafValue::from("x"));

        let leaf: LeafValue = serde_json::from_value(json!(null)).unwrap();
        assert!(leaf.is_null());
    }

    #[test]
    fn test_nested_object_rejected() {
        let result: Result<LeafValue, _> = serde_json::from_value(json!({ "a": 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_row_deserializes_from_json_object() {
        let row: Row = serde_json::from_value(json!({
            "tenant": 1,
            "departments/name": "Ops",
            "departments/active": true
        }))
        .unwrap();

        assert_eq!(row.len(), 3);
        assert_eq!(row["tenant"], LeafValue::Int(1));
        assert_eq!(row.get_index(1).unwrap().0, "departments/name");
    }

    #[test]
    fn test_non_finite_float_serializes_as_null() {
        assert_eq!(serde_json::Value::from(LeafValue::Float(f64::NAN)), json!(null));
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(LeafValue::from("10").as_numeric(), Some(Numeric::Int(10)));
        assert_eq!(LeafValue::from(" 2.5 ").as_numeric(), Some(Numeric::Float(2.5)));
        assert_eq!(LeafValue::from("abc").as_numeric(), None);
        assert_eq!(LeafValue::Bool(true).as_numeric(), None);
        assert_eq!(
            Numeric::Int(9).compare(Numeric::Float(10.5)),
            Ordering::Less
        );
    }

    #[test]
    fn test_composite_key_value_equality() {
        let a = CompositeKey::new(vec!["D-1".into(), LeafValue::Int(7)]);
        let b = CompositeKey::new(vec!["D-1".into(), LeafValue::Int(7)]);
        let c = CompositeKey::new(vec!["D-1".into(), LeafValue::from("7")]);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<CompositeKey> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_composite_key_float_zero_identity() {
        let a = CompositeKey::new(vec![LeafValue::Float(0.0)]);
        let b = CompositeKey::new(vec![LeafValue::Float(-0.0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_composite_key_display() {
        assert_eq!(CompositeKey::empty().to_string(), "<all rows>");
        assert_eq!(CompositeKey::new(vec![LeafValue::Int(1)]).to_string(), "1");
        assert_eq!(
            CompositeKey::new(vec!["eu".into(), LeafValue::Int(2)]).to_string(),
            "(\"eu\", 2)"
        );
    }
}
