//! Tree-sitter integration for HTML markup.
//!
//! Markup is parsed with the tree-sitter HTML grammar, which recovers from
//! any input. The resulting CST is turned into an editable [`crate::dom`]
//! tree; ERROR nodes are only reported, never fatal.

pub mod errors;
pub mod parser;
pub mod validator;

pub use errors::TreeSitterError;
pub use parser::{ErrorNode, HtmlParser, ParsedSource};
pub use validator::{count_errors, validate_markup};
