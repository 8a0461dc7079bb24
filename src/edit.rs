//! Structural edits: insert, delete and replace against a located element.
//!
//! [`try_apply`] reports exactly what happened as a typed outcome or error.
//! [`apply`] is the fail-soft boundary on top of it: any locator miss or
//! failure returns the original markup untouched, so a stale selector never
//! aborts an editing session. Swallowed failures are logged, not lost.

use crate::dom::{self, Document, NodeId};
use crate::selector::{self, Selector, SelectorError};
use crate::ts::{self, TreeSitterError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

/// Where inserted content lands relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Sibling immediately before the target.
    #[default]
    Before,
    /// Sibling immediately after the target.
    After,
    /// Last child of the target.
    Append,
}

impl Position {
    pub fn parse(s: &str) -> Result<Self, MutationError> {
        match s {
            "before" => Ok(Position::Before),
            "after" => Ok(Position::After),
            "append" => Ok(Position::Append),
            other => Err(MutationError::UnknownPosition(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Before => "before",
            Position::After => "after",
            Position::Append => "append",
        }
    }
}

/// Operation name as a closed set plus whatever else a caller sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Delete,
    Replace,
    Other(String),
}

impl OperationKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "insert" => OperationKind::Insert,
            "delete" => OperationKind::Delete,
            "replace" => OperationKind::Replace,
            other => OperationKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Delete => "delete",
            OperationKind::Replace => "replace",
            OperationKind::Other(name) => name,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural edit. `target` is a selector; `content` is markup.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Operation does nothing until applied"]
pub enum Operation {
    Insert {
        target: String,
        content: String,
        position: Position,
    },
    Delete {
        target: String,
    },
    Replace {
        target: String,
        content: String,
    },
}

impl Operation {
    pub fn insert(target: impl Into<String>, content: impl Into<String>, position: Position) -> Self {
        Operation::Insert {
            target: target.into(),
            content: content.into(),
            position,
        }
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Operation::Delete {
            target: target.into(),
        }
    }

    pub fn replace(target: impl Into<String>, content: impl Into<String>) -> Self {
        Operation::Replace {
            target: target.into(),
            content: content.into(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Insert { .. } => OperationKind::Insert,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Replace { .. } => OperationKind::Replace,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Operation::Insert { target, .. }
            | Operation::Delete { target }
            | Operation::Replace { target, .. } => target,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Operation::Insert { content, .. } | Operation::Replace { content, .. } => Some(content),
            Operation::Delete { .. } => None,
        }
    }

    /// Build an operation from its wire form.
    ///
    /// Reads `target_selector` (required), `content` (default empty) and
    /// `position` (default `before`, insert only).
    pub fn from_parameters(operation: &str, params: &Map<String, Value>) -> Result<Self, MutationError> {
        let kind = OperationKind::parse(operation);
        if let OperationKind::Other(name) = &kind {
            return Err(MutationError::UnknownOperation(name.clone()));
        }
        let target = param_str(params, "target_selector")
            .ok_or(MutationError::MissingParameter("target_selector"))?;
        let content = param_str(params, "content").unwrap_or_default();

        Ok(match kind {
            OperationKind::Insert => {
                let position = match param_str(params, "position") {
                    Some(position) => Position::parse(&position)?,
                    None => Position::default(),
                };
                Operation::insert(target, content, position)
            }
            OperationKind::Delete => Operation::delete(target),
            OperationKind::Replace | OperationKind::Other(_) => {
                Operation::replace(target, content)
            }
        })
    }
}

/// String view of a wire parameter. `null` counts as absent; non-string
/// values use their JSON text.
pub(crate) fn param_str(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("unknown insert position '{0}' (expected before, after or append)")]
    UnknownPosition(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("invalid selector '{selector}': {source}")]
    InvalidSelector {
        selector: String,
        #[source]
        source: SelectorError,
    },

    #[error("markup could not be parsed: {0}")]
    Parse(#[from] TreeSitterError),

    #[error("target node {0} is not attached to a parent")]
    Orphaned(NodeId),
}

/// Result of applying an operation to markup.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "MutationOutcome should be checked for applied/no-match"]
pub enum MutationOutcome {
    /// The target was found and the tree changed.
    Applied {
        markup: String,
        kind: OperationKind,
        /// xxh3 of the markup before the edit
        before_hash: u64,
        /// xxh3 of the markup after the edit
        after_hash: u64,
        /// ERROR/MISSING nodes in the content fragment
        fragment_errors: usize,
    },
    /// The selector matched nothing; the markup is unchanged.
    NoMatch {
        selector: String,
        suggestion: Option<String>,
    },
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied { .. })
    }
}

/// Result of applying an operation to a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Applied { fragment_errors: usize },
    NoMatch { suggestion: Option<String> },
}

/// Apply `operation` to an already-parsed document, in place.
///
/// The document is only touched when the target resolves.
pub fn apply_to_document(doc: &mut Document, operation: &Operation) -> Result<TreeChange, MutationError> {
    let selector = Selector::parse(operation.target()).map_err(|source| {
        MutationError::InvalidSelector {
            selector: operation.target().to_string(),
            source,
        }
    })?;

    let fragment = operation.content().map(dom::parse_fragment).transpose()?;
    let fragment_errors = operation.content().map_or(0, ts::count_errors);

    let Some(target) = doc.select_first(&selector) else {
        let suggestion = selector
            .target_id()
            .and_then(|wanted| selector::suggest_id(doc, wanted));
        return Ok(TreeChange::NoMatch { suggestion });
    };
    if doc.parent(target).is_none() {
        return Err(MutationError::Orphaned(target));
    }

    let nodes = match &fragment {
        Some(fragment) => doc.import_children(fragment),
        None => Vec::new(),
    };

    match operation {
        Operation::Insert { position, .. } => match position {
            Position::Before => {
                for node in nodes {
                    doc.insert_before(target, node);
                }
            }
            Position::After => {
                let mut anchor = target;
                for node in nodes {
                    doc.insert_after(anchor, node);
                    anchor = node;
                }
            }
            Position::Append => {
                for node in nodes {
                    doc.append_child(target, node);
                }
            }
        },
        Operation::Delete { .. } => doc.detach(target),
        Operation::Replace { .. } => {
            for node in nodes {
                doc.insert_before(target, node);
            }
            doc.detach(target);
        }
    }

    debug!(
        kind = %operation.kind(),
        target = operation.target(),
        node = %target,
        "applied tree edit"
    );
    Ok(TreeChange::Applied { fragment_errors })
}

/// Parse `markup`, apply `operation`, and serialize the result.
pub fn try_apply(markup: &str, operation: &Operation) -> Result<MutationOutcome, MutationError> {
    let mut doc = dom::parse(markup)?;

    match apply_to_document(&mut doc, operation)? {
        TreeChange::Applied { fragment_errors } => {
            let updated = doc.to_html();
            Ok(MutationOutcome::Applied {
                kind: operation.kind(),
                before_hash: xxh3_64(markup.as_bytes()),
                after_hash: xxh3_64(updated.as_bytes()),
                markup: updated,
                fragment_errors,
            })
        }
        TreeChange::NoMatch { suggestion } => Ok(MutationOutcome::NoMatch {
            selector: operation.target().to_string(),
            suggestion,
        }),
    }
}

/// Fail-soft edit: the updated markup, or `markup` itself when the target
/// does not resolve or anything goes wrong.
pub fn apply(markup: &str, operation: &Operation) -> String {
    match try_apply(markup, operation) {
        Ok(MutationOutcome::Applied { markup, .. }) => markup,
        Ok(MutationOutcome::NoMatch { selector, suggestion }) => {
            debug!(%selector, ?suggestion, "selector matched nothing; markup unchanged");
            markup.to_string()
        }
        Err(err) => {
            warn!(error = %err, "edit failed; returning original markup");
            markup.to_string()
        }
    }
}

/// Wire entry point: operation name plus parameter map, markup in and out.
pub fn execute_dom_operation(markup: &str, operation: &str, params: &Map<String, Value>) -> String {
    match Operation::from_parameters(operation, params) {
        Ok(op) => apply(markup, &op),
        Err(err) => {
            warn!(error = %err, operation, "rejected edit request; returning original markup");
            markup.to_string()
        }
    }
}

/// Write `contents` to `path` atomically: tempfile in the same directory,
/// fsync, rename.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
