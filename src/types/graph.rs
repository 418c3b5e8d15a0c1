//! Graph entities and their table-driven wire decoding.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::tag;
use super::value::{map_from_wire, map_to_wire, Map, Value};
use crate::error::BoltError;
use crate::packstream::{PackStruct, PackValue};

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    /// Server element id. Equals the decimal `id` before protocol 5.
    pub element_id: String,
    pub labels: BTreeSet<String>,
    pub properties: Map,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: i64,
    pub element_id: String,
    pub start_node_id: i64,
    pub start_element_id: String,
    pub end_node_id: i64,
    pub end_element_id: String,
    pub rel_type: String,
    pub properties: Map,
}

/// An alternating walk of nodes and relationships.
///
/// Relationship `i` always connects `nodes()[i]` and `nodes()[i + 1]`, in
/// either direction; `len()` counts relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
}

/// One step of a path, in traversal order.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub start: &'a Node,
    pub relationship: &'a Relationship,
    pub end: &'a Node,
}

impl Segment<'_> {
    /// True when the relationship points against the traversal direction.
    pub fn is_reversed(&self) -> bool {
        self.relationship.start_node_id != self.start.id
    }
}

impl Node {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Strict property lookup: a missing key is an error, never `Null`.
    pub fn property(&self, name: &str) -> Result<&Value, BoltError> {
        self.properties
            .get(name)
            .ok_or_else(|| BoltError::NotFound(format!("property `{name}` on node {}", self.id)))
    }

    pub(crate) fn to_wire(&self) -> PackStruct {
        PackStruct::new(
            tag::NODE,
            vec![
                PackValue::Integer(self.id),
                PackValue::List(self.labels.iter().cloned().map(PackValue::String).collect()),
                PackValue::Dict(map_to_wire(&self.properties)),
                PackValue::String(self.element_id.clone()),
            ],
        )
    }
}

impl Relationship {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Strict property lookup: a missing key is an error, never `Null`.
    pub fn property(&self, name: &str) -> Result<&Value, BoltError> {
        self.properties.get(name).ok_or_else(|| {
            BoltError::NotFound(format!("property `{name}` on relationship {}", self.id))
        })
    }

    /// Whether this relationship joins `a` and `b`, in either direction.
    pub fn connects(&self, a: &Node, b: &Node) -> bool {
        (self.start_node_id == a.id && self.end_node_id == b.id)
            || (self.start_node_id == b.id && self.end_node_id == a.id)
    }

    pub(crate) fn to_wire(&self) -> PackStruct {
        PackStruct::new(
            tag::RELATIONSHIP,
            vec![
                PackValue::Integer(self.id),
                PackValue::Integer(self.start_node_id),
                PackValue::Integer(self.end_node_id),
                PackValue::String(self.rel_type.clone()),
                PackValue::Dict(map_to_wire(&self.properties)),
                PackValue::String(self.element_id.clone()),
                PackValue::String(self.start_element_id.clone()),
                PackValue::String(self.end_element_id.clone()),
            ],
        )
    }
}

impl Path {
    /// Builds a path, checking that relationship `i` joins node `i` and `i + 1`.
    pub fn new(nodes: Vec<Node>, relationships: Vec<Relationship>) -> Result<Self, BoltError> {
        if nodes.len() != relationships.len() + 1 {
            return Err(BoltError::unsupported(format!(
                "path with {} relationships needs {} nodes, got {}",
                relationships.len(),
                relationships.len() + 1,
                nodes.len()
            )));
        }
        for (i, rel) in relationships.iter().enumerate() {
            if !rel.connects(&nodes[i], &nodes[i + 1]) {
                return Err(BoltError::unsupported(format!(
                    "path relationship {} does not join nodes {} and {}",
                    rel.id,
                    nodes[i].id,
                    nodes[i + 1].id
                )));
            }
        }
        Ok(Self {
            nodes,
            relationships,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn start(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn end(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        self.relationships
            .iter()
            .enumerate()
            .map(|(i, relationship)| Segment {
                start: &self.nodes[i],
                relationship,
                end: &self.nodes[i + 1],
            })
    }

    /// Re-packs the walk as unique nodes, unique unbound relationships and
    /// the signed index sequence.
    pub(crate) fn to_wire(&self) -> PackStruct {
        let mut nodes: Vec<&Node> = Vec::new();
        let mut node_index: HashMap<i64, i64> = HashMap::new();
        for node in &self.nodes {
            node_index.entry(node.id).or_insert_with(|| {
                nodes.push(node);
                (nodes.len() - 1) as i64
            });
        }

        let mut rels: Vec<&Relationship> = Vec::new();
        let mut rel_index: HashMap<i64, i64> = HashMap::new();
        let mut indices = Vec::with_capacity(self.relationships.len() * 2);
        for segment in self.segments() {
            let rel = segment.relationship;
            let one_based = *rel_index.entry(rel.id).or_insert_with(|| {
                rels.push(rel);
                rels.len() as i64
            });
            indices.push(if segment.is_reversed() { -one_based } else { one_based });
            indices.push(node_index[&segment.end.id]);
        }

        PackStruct::new(
            tag::PATH,
            vec![
                PackValue::List(nodes.iter().map(|n| PackValue::Struct(n.to_wire())).collect()),
                PackValue::List(
                    rels.iter()
                        .map(|r| {
                            PackValue::Struct(PackStruct::new(
                                tag::UNBOUND_RELATIONSHIP,
                                vec![
                                    PackValue::Integer(r.id),
                                    PackValue::String(r.rel_type.clone()),
                                    PackValue::Dict(map_to_wire(&r.properties)),
                                    PackValue::String(r.element_id.clone()),
                                ],
                            ))
                        })
                        .collect(),
                ),
                PackValue::List(indices.into_iter().map(PackValue::Integer).collect()),
            ],
        )
    }
}

// -- Wire decoding --

type Decoder = fn(&[PackValue]) -> Result<Value, BoltError>;

/// Structure tag → (name, minimum field count, decoder).
const DECODERS: &[(u8, &str, usize, Decoder)] = &[
    (tag::NODE, "Node", 3, node_value),
    (tag::RELATIONSHIP, "Relationship", 5, relationship_value),
    (tag::PATH, "Path", 3, path_value),
];

fn node_value(f: &[PackValue]) -> Result<Value, BoltError> {
    decode_node(f).map(Value::Node)
}

fn relationship_value(f: &[PackValue]) -> Result<Value, BoltError> {
    decode_relationship(f).map(Value::Relationship)
}

fn path_value(f: &[PackValue]) -> Result<Value, BoltError> {
    decode_path(f).map(Value::Path)
}

/// Interprets a wire structure as a graph value.
pub(crate) fn decode_struct(s: &PackStruct) -> Result<Value, BoltError> {
    let Some(&(_, name, min_fields, decode)) = DECODERS.iter().find(|d| d.0 == s.tag) else {
        return Err(if s.tag == tag::UNBOUND_RELATIONSHIP {
            BoltError::unsupported("unbound relationship outside of a path")
        } else {
            BoltError::unsupported(format!("unknown structure tag 0x{:02X}", s.tag))
        });
    };
    check_fields(name, &s.fields, min_fields)?;
    decode(&s.fields)
}

fn check_fields(name: &str, fields: &[PackValue], min: usize) -> Result<(), BoltError> {
    if fields.len() < min {
        return Err(BoltError::unsupported(format!(
            "{name} structure needs at least {min} fields, got {}",
            fields.len()
        )));
    }
    Ok(())
}

fn decode_node(f: &[PackValue]) -> Result<Node, BoltError> {
    let id = int_field("Node", "id", &f[0])?;
    let labels = match &f[1] {
        PackValue::List(items) => items
            .iter()
            .map(|l| string_field("Node", "label", l))
            .collect::<Result<BTreeSet<_>, _>>()?,
        other => return Err(wrong_field("Node", "labels", "list", other)),
    };
    let properties = dict_field("Node", &f[2])?;
    let element_id = match f.get(3) {
        Some(v) => string_field("Node", "element_id", v)?,
        None => id.to_string(),
    };
    Ok(Node {
        id,
        element_id,
        labels,
        properties,
    })
}

fn decode_relationship(f: &[PackValue]) -> Result<Relationship, BoltError> {
    let id = int_field("Relationship", "id", &f[0])?;
    let start_node_id = int_field("Relationship", "start_node_id", &f[1])?;
    let end_node_id = int_field("Relationship", "end_node_id", &f[2])?;
    let rel_type = string_field("Relationship", "type", &f[3])?;
    let properties = dict_field("Relationship", &f[4])?;
    let (element_id, start_element_id, end_element_id) = if f.len() >= 8 {
        (
            string_field("Relationship", "element_id", &f[5])?,
            string_field("Relationship", "start_element_id", &f[6])?,
            string_field("Relationship", "end_element_id", &f[7])?,
        )
    } else {
        (
            id.to_string(),
            start_node_id.to_string(),
            end_node_id.to_string(),
        )
    };
    Ok(Relationship {
        id,
        element_id,
        start_node_id,
        start_element_id,
        end_node_id,
        end_element_id,
        rel_type,
        properties,
    })
}

/// A path relationship before its endpoints are known.
struct Unbound {
    id: i64,
    element_id: String,
    rel_type: String,
    properties: Map,
}

impl Unbound {
    fn bind(&self, start: &Node, end: &Node) -> Relationship {
        Relationship {
            id: self.id,
            element_id: self.element_id.clone(),
            start_node_id: start.id,
            start_element_id: start.element_id.clone(),
            end_node_id: end.id,
            end_element_id: end.element_id.clone(),
            rel_type: self.rel_type.clone(),
            properties: self.properties.clone(),
        }
    }
}

fn decode_unbound(v: &PackValue) -> Result<Unbound, BoltError> {
    let f = match v {
        PackValue::Struct(s) if s.tag == tag::UNBOUND_RELATIONSHIP => &s.fields,
        other => return Err(wrong_field("Path", "relationship", "unbound relationship", other)),
    };
    check_fields("UnboundRelationship", f, 3)?;
    let id = int_field("UnboundRelationship", "id", &f[0])?;
    Ok(Unbound {
        id,
        rel_type: string_field("UnboundRelationship", "type", &f[1])?,
        properties: dict_field("UnboundRelationship", &f[2])?,
        element_id: match f.get(3) {
            Some(v) => string_field("UnboundRelationship", "element_id", v)?,
            None => id.to_string(),
        },
    })
}

fn decode_path(f: &[PackValue]) -> Result<Path, BoltError> {
    let nodes = list_field("Path", "nodes", &f[0])?
        .iter()
        .map(|v| match v {
            PackValue::Struct(s) if s.tag == tag::NODE => {
                check_fields("Node", &s.fields, 3)?;
                decode_node(&s.fields)
            }
            other => Err(wrong_field("Path", "node", "node", other)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let rels = list_field("Path", "relationships", &f[1])?
        .iter()
        .map(decode_unbound)
        .collect::<Result<Vec<_>, _>>()?;
    let indices = list_field("Path", "indices", &f[2])?
        .iter()
        .map(|v| int_field("Path", "index", v))
        .collect::<Result<Vec<_>, _>>()?;

    let Some(first) = nodes.first() else {
        return Err(BoltError::unsupported("path without nodes"));
    };
    if indices.len() % 2 != 0 {
        return Err(BoltError::unsupported(format!(
            "path index sequence has odd length {}",
            indices.len()
        )));
    }

    let mut walk_nodes = Vec::with_capacity(indices.len() / 2 + 1);
    let mut walk_rels = Vec::with_capacity(indices.len() / 2);
    walk_nodes.push(first.clone());
    let mut prev = first;
    for pair in indices.chunks_exact(2) {
        let (rel_idx, node_idx) = (pair[0], pair[1]);
        let next = usize::try_from(node_idx)
            .ok()
            .and_then(|i| nodes.get(i))
            .ok_or_else(|| {
                BoltError::unsupported(format!("path node index {node_idx} out of range"))
            })?;
        // Relationship indices are 1-based; the sign carries the direction.
        let rel = (rel_idx != 0)
            .then(|| usize::try_from(rel_idx.unsigned_abs() - 1).ok())
            .flatten()
            .and_then(|i| rels.get(i))
            .ok_or_else(|| {
                BoltError::unsupported(format!("path relationship index {rel_idx} out of range"))
            })?;
        let bound = if rel_idx > 0 {
            rel.bind(prev, next)
        } else {
            rel.bind(next, prev)
        };
        walk_rels.push(bound);
        walk_nodes.push(next.clone());
        prev = next;
    }

    Ok(Path {
        nodes: walk_nodes,
        relationships: walk_rels,
    })
}

// -- Field extraction helpers --

fn wrong_field(owner: &str, field: &str, expected: &str, got: &PackValue) -> BoltError {
    BoltError::unsupported(format!(
        "{owner} field `{field}` must be {expected}, got {}",
        got.kind()
    ))
}

fn int_field(owner: &str, field: &str, v: &PackValue) -> Result<i64, BoltError> {
    v.as_int()
        .ok_or_else(|| wrong_field(owner, field, "an integer", v))
}

fn string_field(owner: &str, field: &str, v: &PackValue) -> Result<String, BoltError> {
    v.as_str()
        .map(str::to_owned)
        .ok_or_else(|| wrong_field(owner, field, "a string", v))
}

fn dict_field(owner: &str, v: &PackValue) -> Result<Map, BoltError> {
    match v {
        PackValue::Dict(d) => map_from_wire(d),
        other => Err(wrong_field(owner, "properties", "a dict", other)),
    }
}

fn list_field<'a>(owner: &str, field: &str, v: &'a PackValue) -> Result<&'a [PackValue], BoltError> {
    match v {
        PackValue::List(items) => Ok(items),
        other => Err(wrong_field(owner, field, "a list", other)),
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for label in &self.labels {
            write!(f, ":{label}")?;
        }
        write!(f, " {{id: {}}})", self.id)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[:{} {{id: {}}}]->({})",
            self.start_node_id, self.rel_type, self.id, self.end_node_id
        )
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start())?;
        for seg in self.segments() {
            if seg.is_reversed() {
                write!(f, "<-[:{}]-{}", seg.relationship.rel_type, seg.end)?;
            } else {
                write!(f, "-[:{}]->{}", seg.relationship.rel_type, seg.end)?;
            }
        }
        Ok(())
    }
}
