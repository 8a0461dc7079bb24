//! Post-edit structural checks with automatic repair.
//!
//! Checks run in a fixed order and each may rewrite the document before the
//! next one looks at it:
//!
//! 1. duplicate ids among section landmarks (renamed with a suffix)
//! 2. missing footer landmark (a placeholder footer is appended)
//! 3. empty section landmarks (filled with placeholder text)
//!
//! The report always carries the repaired markup, whether or not anything
//! was wrong.

use crate::changelog::ChangelogEntry;
use crate::config::EditorSettings;
use crate::dom::{self, Document, Element, NodeId};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

pub const NO_ISSUES: &str = "No issues detected.";
pub const HEALTHY: &str = "DOM is healthy.";
pub const MANUAL_REVIEW: &str = "Manual review needed.";

/// A detected problem and the fix applied for it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub description: String,
    pub fix: Option<String>,
}

impl Issue {
    fn fixed(description: String, fix: String) -> Self {
        Self {
            description,
            fix: Some(fix),
        }
    }

    fn unresolved(description: String) -> Self {
        Self {
            description,
            fix: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub success: bool,
    /// Last fix applied, or a fixed marker when there was none.
    pub repair_action: String,
    /// Every fix applied, in order.
    pub repairs: Vec<String>,
    /// Issue descriptions joined with `; `.
    pub message: String,
    pub repaired_dom: String,
    pub issues: Vec<Issue>,
}

impl RepairReport {
    pub fn from_issues(issues: Vec<Issue>, repaired_dom: String) -> Self {
        if issues.is_empty() {
            return Self {
                success: true,
                repair_action: NO_ISSUES.to_string(),
                repairs: Vec::new(),
                message: HEALTHY.to_string(),
                repaired_dom,
                issues,
            };
        }

        let repairs: Vec<String> = issues.iter().filter_map(|i| i.fix.clone()).collect();
        let repair_action = repairs
            .last()
            .cloned()
            .unwrap_or_else(|| MANUAL_REVIEW.to_string());
        let message = issues
            .iter()
            .map(|i| i.description.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            success: false,
            repair_action,
            repairs,
            message,
            repaired_dom,
            issues,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Repairer {
    settings: EditorSettings,
}

impl Repairer {
    pub fn new(settings: EditorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Parse, check and repair `markup`.
    ///
    /// `history` is accepted for cross-entry checks and currently unused.
    pub fn validate_and_repair(&self, markup: &str, _history: &[ChangelogEntry]) -> RepairReport {
        let mut doc = match dom::parse(markup) {
            Ok(doc) => doc,
            Err(err) => {
                let issue = Issue::unresolved(format!("Markup could not be parsed: {err}"));
                return RepairReport::from_issues(vec![issue], markup.to_string());
            }
        };

        let issues = self.repair_document(&mut doc);
        RepairReport::from_issues(issues, doc.to_html())
    }

    /// Run every check against `doc`, repairing in place.
    pub fn repair_document(&self, doc: &mut Document) -> Vec<Issue> {
        let sections: Vec<NodeId> = doc
            .elements()
            .filter(|&id| {
                doc.element(id)
                    .is_some_and(|el| self.settings.is_section_tag(&el.name))
            })
            .collect();

        let mut issues = Vec::new();
        self.rename_duplicate_ids(doc, &sections, &mut issues);
        self.ensure_footer(doc, &mut issues);
        self.fill_empty_sections(doc, &sections, &mut issues);

        debug!(
            sections = sections.len(),
            issues = issues.len(),
            "structural check finished"
        );
        issues
    }

    fn rename_duplicate_ids(&self, doc: &mut Document, sections: &[NodeId], issues: &mut Vec<Issue>) {
        let suffix = &self.settings.repair.duplicate_suffix;
        let mut seen: HashSet<String> = HashSet::new();

        for &section in sections {
            let Some(el) = doc.element(section) else {
                continue;
            };
            let tag = el.name.clone();
            let id = match el.id() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => continue,
            };

            if !seen.contains(&id) {
                seen.insert(id);
                continue;
            }

            let mut renamed = format!("{id}{suffix}");
            if self.settings.repair.rescan_duplicates {
                while seen.contains(&renamed) {
                    renamed.push_str(suffix);
                }
                seen.insert(renamed.clone());
            }
            if let Some(el) = doc.element_mut(section) {
                el.set_attr("id", renamed.as_str());
            }

            issues.push(Issue::fixed(
                format!("Duplicate {tag} id: {id}"),
                format!("Renamed duplicate {tag} id {id} to {renamed}"),
            ));
        }
    }

    fn ensure_footer(&self, doc: &mut Document, issues: &mut Vec<Issue>) {
        let footer_tag = &self.settings.landmarks.footer_tag;
        if doc.find_first_by_tag(footer_tag).is_some() {
            return;
        }

        let parent = doc.find_first_by_tag("body").unwrap_or_else(|| doc.root());
        let footer = doc.create_element(Element::new(footer_tag.as_str()));
        doc.set_text_content(footer, self.settings.repair.footer_placeholder.as_str());
        doc.append_child(parent, footer);

        issues.push(Issue::fixed(
            format!("Missing <{footer_tag}> element"),
            format!("Added missing <{footer_tag}> element."),
        ));
    }

    fn fill_empty_sections(&self, doc: &mut Document, sections: &[NodeId], issues: &mut Vec<Issue>) {
        for &section in sections {
            if !doc.text_content(section).trim().is_empty() {
                continue;
            }
            let Some(el) = doc.element(section) else {
                continue;
            };
            let tag = el.name.clone();
            let id = el.id().unwrap_or("none").to_string();

            doc.set_text_content(section, self.settings.repair.section_placeholder.as_str());
            issues.push(Issue::fixed(
                format!("Empty {tag} detected (id={id})"),
                format!("Filled empty {tag} (id={id}) with placeholder content."),
            ));
        }
    }
}

/// Check and repair with stock settings.
pub fn validate_and_repair(markup: &str, history: &[ChangelogEntry]) -> RepairReport {
    Repairer::default().validate_and_repair(markup, history)
}
