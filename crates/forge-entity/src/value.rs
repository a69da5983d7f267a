//! Persistent attribute tree
//!
//! Provides [`Attr`], the value type every entity field is made of. Containers
//! are backed by `im` persistent collections, so cloning is O(1) and an edit
//! only copies the spine from the root to the changed node. Everything else
//! stays pointer-shared with the previous version.

use im::{OrdMap, Vector};
use serde_json::{Map, Number, Value};

/// Map node of the attribute tree
pub type AttrMap = OrdMap<String, Attr>;

/// List node of the attribute tree
pub type AttrList = Vector<Attr>;

/// A node in an entity's attribute tree
///
/// Mirrors the JSON data model. Serializes as plain JSON.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Attr {
    /// Absent / null value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Number (integer or float, JSON semantics)
    Number(Number),
    /// UTF-8 text
    Text(String),
    /// Ordered list
    List(AttrList),
    /// Keyed map (sorted by key)
    Map(AttrMap),
}

impl Attr {
    /// Empty map node
    #[inline]
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(OrdMap::new())
    }

    /// Empty list node
    #[inline]
    #[must_use]
    pub fn empty_list() -> Self {
        Self::List(Vector::new())
    }

    /// Check for null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check whether this node can hold children
    #[inline]
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    /// Borrow as text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read as boolean
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read as signed integer
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Read as float
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Borrow as list
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&AttrList> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as map
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the node kind, used in diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// True when both nodes are backed by the same container allocations
    ///
    /// Scalars never share storage, so for them this falls back to equality.
    /// Small lists are stored inline by `im`; those count as shared when every
    /// element is.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => {
                a.ptr_eq(b)
                    || (a.len() == b.len()
                        && a.iter().zip(b.iter()).all(|(x, y)| x.shares_storage_with(y)))
            }
            (a, b) => a == b,
        }
    }
}

impl From<Value> for Attr {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Attr::from).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Attr::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Attr> for Value {
    fn from(attr: Attr) -> Self {
        match attr {
            Attr::Null => Value::Null,
            Attr::Bool(b) => Value::Bool(b),
            Attr::Number(n) => Value::Number(n),
            Attr::Text(s) => Value::String(s),
            Attr::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Attr::Map(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k, Value::from(v));
                }
                Value::Object(out)
            }
        }
    }
}

impl From<&str> for Attr {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Attr {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Attr {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Attr {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Attr {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<AttrMap> for Attr {
    fn from(map: AttrMap) -> Self {
        Self::Map(map)
    }
}

impl From<AttrList> for Attr {
    fn from(items: AttrList) -> Self {
        Self::List(items)
    }
}
