//! CSS-style locators.
//!
//! A [`Selector`] resolves to elements of a [`crate::dom::Document`] in
//! document order. Resolution for editing is first-match: callers are
//! expected to write selectors specific enough to pick one node, and an
//! ambiguous selector silently picks the first.
//!
//! Supported syntax:
//!
//! ```text
//! section  *  #hero  .card  [data-x]  [a=v]  [a~=v]  [a|=v]  [a^=v]  [a$=v]  [a*=v]
//! :first-child  :last-child  :only-child  :nth-child(2|odd|even)
//! A B   A > B   A + B   A ~ B   A, B
//! ```

mod matcher;
mod parser;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use matcher::suggest_id;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("expected a name at position {pos}")]
    ExpectedName { pos: usize },

    #[error("unterminated attribute selector starting at position {pos}")]
    UnterminatedAttribute { pos: usize },

    #[error("unterminated pseudo-class argument starting at position {pos}")]
    UnterminatedPseudo { pos: usize },

    #[error("unsupported pseudo-class ':{0}'")]
    UnknownPseudo(String),

    #[error("combinator at position {pos} is not followed by a selector")]
    DanglingCombinator { pos: usize },

    #[error("invalid :nth-child argument '{0}'")]
    InvalidNth(String),
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<ComplexSelector>,
}

/// Compound selectors joined by combinators, written left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<CompoundSelector>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
    pub combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// Lowercased tag name; `None` for `*` or when omitted.
    pub tag: Option<String>,
    pub simple: Vec<SimpleSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Id(String),
    Class(String),
    Attribute {
        name: String,
        matcher: Option<(AttrOperator, String)>,
    },
    FirstChild,
    LastChild,
    OnlyChild,
    NthChild(Nth),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOperator {
    /// `=`
    Equals,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nth {
    /// 1-based position.
    Index(usize),
    Odd,
    Even,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let alternatives = parser::parse_list(input)?;
        Ok(Self {
            source: input.trim().to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn alternatives(&self) -> &[ComplexSelector] {
        &self.alternatives
    }

    /// The id this selector pins down, when it is a single compound with an
    /// `#id` part (`#hero`, `section#hero`).
    pub fn target_id(&self) -> Option<&str> {
        let [complex] = self.alternatives.as_slice() else {
            return None;
        };
        let compound = complex.compounds.last()?;
        compound.simple.iter().find_map(|s| match s {
            SimpleSelector::Id(id) => Some(id.as_str()),
            _ => None,
        })
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
