//! The closed value model handed to callers.

use std::collections::HashMap;
use std::fmt;

use super::graph::{self, Node, Path, Relationship};
use crate::error::BoltError;
use crate::packstream::{Dict, PackValue};

/// Property map. Keys are unique; comparison ignores insertion order.
pub type Map = HashMap<String, Value>;

/// A decoded query value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
    Node(Node),
    Relationship(Relationship),
    Path(Path),
}

impl Value {
    /// Name of the variant, as reported in [`BoltError::TypeMismatch`].
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
            Self::Node(_) => "Node",
            Self::Relationship(_) => "Relationship",
            Self::Path(_) => "Path",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Result<bool, BoltError> {
        match self {
            Self::Boolean(b) => Ok(*b),
            other => Err(other.mismatch("Boolean")),
        }
    }

    pub fn as_integer(&self) -> Result<i64, BoltError> {
        match self {
            Self::Integer(i) => Ok(*i),
            other => Err(other.mismatch("Integer")),
        }
    }

    /// Returns the float. Integers are not widened.
    pub fn as_float(&self) -> Result<f64, BoltError> {
        match self {
            Self::Float(f) => Ok(*f),
            other => Err(other.mismatch("Float")),
        }
    }

    pub fn as_str(&self) -> Result<&str, BoltError> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(other.mismatch("String")),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], BoltError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.mismatch("List")),
        }
    }

    pub fn as_map(&self) -> Result<&Map, BoltError> {
        match self {
            Self::Map(map) => Ok(map),
            other => Err(other.mismatch("Map")),
        }
    }

    pub fn as_node(&self) -> Result<&Node, BoltError> {
        match self {
            Self::Node(n) => Ok(n),
            other => Err(other.mismatch("Node")),
        }
    }

    pub fn as_relationship(&self) -> Result<&Relationship, BoltError> {
        match self {
            Self::Relationship(r) => Ok(r),
            other => Err(other.mismatch("Relationship")),
        }
    }

    pub fn as_path(&self) -> Result<&Path, BoltError> {
        match self {
            Self::Path(p) => Ok(p),
            other => Err(other.mismatch("Path")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> BoltError {
        BoltError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }

    /// Builds a value from its wire form.
    ///
    /// Structures are interpreted through the graph tag table; anything the
    /// table does not know fails instead of being dropped.
    pub fn from_wire(wire: &PackValue) -> Result<Self, BoltError> {
        Ok(match wire {
            PackValue::Null => Self::Null,
            PackValue::Boolean(b) => Self::Boolean(*b),
            PackValue::Integer(i) => Self::Integer(*i),
            PackValue::Float(f) => Self::Float(*f),
            PackValue::String(s) => Self::String(s.clone()),
            PackValue::List(items) => {
                Self::List(items.iter().map(Self::from_wire).collect::<Result<_, _>>()?)
            }
            PackValue::Dict(dict) => Self::Map(map_from_wire(dict)?),
            PackValue::Struct(s) => graph::decode_struct(s)?,
            PackValue::Bytes(b) => {
                return Err(BoltError::unsupported(format!(
                    "byte array of {} bytes has no value model counterpart",
                    b.len()
                )));
            }
        })
    }

    /// Converts the value into its wire form.
    pub fn to_wire(&self) -> PackValue {
        match self {
            Self::Null => PackValue::Null,
            Self::Boolean(b) => PackValue::Boolean(*b),
            Self::Integer(i) => PackValue::Integer(*i),
            Self::Float(f) => PackValue::Float(*f),
            Self::String(s) => PackValue::String(s.clone()),
            Self::List(items) => PackValue::List(items.iter().map(Self::to_wire).collect()),
            Self::Map(map) => PackValue::Dict(map_to_wire(map)),
            Self::Node(n) => PackValue::Struct(n.to_wire()),
            Self::Relationship(r) => PackValue::Struct(r.to_wire()),
            Self::Path(p) => PackValue::Struct(p.to_wire()),
        }
    }
}

pub(crate) fn map_from_wire(dict: &Dict) -> Result<Map, BoltError> {
    dict.iter()
        .map(|(k, v)| Ok((k.clone(), Value::from_wire(v)?)))
        .collect()
}

/// Converts query parameters (or any map) into a wire dictionary.
pub fn map_to_wire(map: &Map) -> Dict {
    map.iter().map(|(k, v)| (k.clone(), v.to_wire())).collect()
}

// -- Convenience conversions --

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Self::Map(m)
    }
}

impl From<Node> for Value {
    fn from(n: Node) -> Self {
        Self::Node(n)
    }
}

impl From<Relationship> for Value {
    fn from(r: Relationship) -> Self {
        Self::Relationship(r)
    }
}

impl From<Path> for Value {
    fn from(p: Path) -> Self {
        Self::Path(p)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, k) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {}", map[k])?;
                }
                write!(f, "}}")
            }
            Self::Node(n) => write!(f, "{n}"),
            Self::Relationship(r) => write!(f, "{r}"),
            Self::Path(p) => write!(f, "{p}"),
        }
    }
}
