//! Editable HTML document tree.
//!
//! Markup is parsed permissively with tree-sitter into an arena-backed
//! [`Document`]. Untouched regions serialize back exactly as written;
//! elements whose end tag was implied get an explicit one.

pub mod builder;
pub mod node;
pub mod serialize;

pub use builder::parse;
pub use node::{decode_entities, Attribute, Document, Element, Node, NodeData, NodeId};
pub use serialize::is_void;

/// Parse a content fragment for insertion.
///
/// Fragments go through the same permissive parse as documents; whatever
/// tree comes out is used as given.
pub fn parse_fragment(source: &str) -> Result<Document, crate::ts::TreeSitterError> {
    parse(source)
}
