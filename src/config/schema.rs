use crate::edit::Position;
use crate::pipeline::EditRequest;
use crate::selector::Selector;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// A batch of edits applied in order to one document.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct EditScript {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub edits: Vec<EditDefinition>,
}

impl EditScript {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.edits.is_empty() {
            issues.push(ValidationIssue::EmptyEditList);
        }

        let mut seen = HashSet::new();
        for edit in &self.edits {
            let edit_id = (!edit.id.trim().is_empty()).then(|| edit.id.clone());
            if edit_id.is_none() {
                issues.push(ValidationIssue::MissingField {
                    edit_id: None,
                    field: "id",
                });
            } else if !seen.insert(edit.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(edit.id.clone()));
            }

            let target = edit.operation.target();
            if target.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    edit_id,
                    field: "operation.target",
                });
            } else if let Err(err) = Selector::parse(target) {
                issues.push(ValidationIssue::InvalidSelector {
                    edit_id,
                    message: err.to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditDefinition {
    pub id: String,
    /// Record the changelog entry as voice-triggered.
    #[serde(default)]
    pub voice: bool,
    pub operation: EditOperation,
    /// Extra changelog detail such as `type` and `location`.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl EditDefinition {
    /// Wire-form request: free-form parameters plus the operation fields.
    pub fn to_request(&self) -> EditRequest {
        let mut parameters = self.parameters.clone();
        parameters.insert(
            "target_selector".to_string(),
            Value::String(self.operation.target().to_string()),
        );
        match &self.operation {
            EditOperation::Insert {
                content, position, ..
            } => {
                parameters.insert("content".to_string(), Value::String(content.clone()));
                parameters.insert(
                    "position".to_string(),
                    Value::String(position.as_str().to_string()),
                );
            }
            EditOperation::Replace { content, .. } => {
                parameters.insert("content".to_string(), Value::String(content.clone()));
            }
            EditOperation::Delete { .. } => {}
        }

        EditRequest {
            operation: self.operation.name().to_string(),
            parameters,
            is_voice_edit: self.voice,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditOperation {
    Insert {
        target: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        position: Position,
    },
    Delete {
        target: String,
    },
    Replace {
        target: String,
        #[serde(default)]
        content: String,
    },
}

impl EditOperation {
    pub fn target(&self) -> &str {
        match self {
            EditOperation::Insert { target, .. }
            | EditOperation::Delete { target }
            | EditOperation::Replace { target, .. } => target,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditOperation::Insert { .. } => "insert",
            EditOperation::Delete { .. } => "delete",
            EditOperation::Replace { .. } => "replace",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyEditList,
    MissingField {
        edit_id: Option<String>,
        field: &'static str,
    },
    DuplicateId(String),
    InvalidSelector {
        edit_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyEditList => write!(f, "edit script contains no edits"),
            ValidationIssue::MissingField { edit_id, field } => match edit_id {
                Some(id) => write!(f, "edit '{id}' missing required field '{field}'"),
                None => write!(f, "edit missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId(id) => write!(f, "edit id '{id}' is used more than once"),
            ValidationIssue::InvalidSelector { edit_id, message } => match edit_id {
                Some(id) => write!(f, "edit '{id}' has an invalid target selector: {message}"),
                None => write!(f, "invalid target selector: {message}"),
            },
        }
    }
}
