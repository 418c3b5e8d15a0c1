//! Graph-aware value model: scalars, containers, nodes, relationships,
//! paths and result records.

mod graph;
mod record;
mod value;

pub use graph::{Node, Path, Relationship, Segment};
pub use record::Record;
pub use value::{map_to_wire, Map, Value};

/// PackStream structure tags for graph values.
pub mod tag {
    pub const NODE: u8 = 0x4E;
    pub const RELATIONSHIP: u8 = 0x52;
    pub const UNBOUND_RELATIONSHIP: u8 = 0x72;
    pub const PATH: u8 = 0x50;
}
