//! Edit script runner.
//!
//! Runs each edit of an [`EditScript`] through the pipeline in order,
//! feeding the markup produced by one edit into the next, and collects the
//! per-edit results and the changelog entries of the edits that applied.

use crate::changelog::{ChangelogEntry, Clock, IdGenerator};
use crate::config::schema::EditScript;
use crate::pipeline::{EditStatus, Pipeline};
use crate::repair::RepairReport;
use std::fmt;
use tracing::debug;

/// Result of one scripted edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "StepResult should be checked for success/failure"]
pub enum StepResult {
    /// Edit applied; markup was repaired if needed.
    Applied { repair: RepairReport },
    /// Target not found; markup unchanged.
    NoMatch { suggestion: Option<String> },
    /// Edit rejected; markup unchanged.
    Failed { reason: String },
}

impl StepResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepResult::Applied { .. })
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepResult::Applied { repair } if repair.success => write!(f, "Applied"),
            StepResult::Applied { repair } => {
                write!(f, "Applied (repaired: {})", repair.repairs.join("; "))
            }
            StepResult::NoMatch {
                suggestion: Some(suggestion),
            } => write!(f, "No match (did you mean #{suggestion}?)"),
            StepResult::NoMatch { suggestion: None } => write!(f, "No match"),
            StepResult::Failed { reason } => write!(f, "Failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    /// Markup after the last edit.
    pub markup: String,
    /// One result per edit, in script order.
    pub steps: Vec<(String, StepResult)>,
    /// Entries for applied edits, in order.
    pub entries: Vec<ChangelogEntry>,
}

impl ScriptRun {
    pub fn applied(&self) -> usize {
        self.steps.iter().filter(|(_, step)| step.is_applied()).count()
    }

    pub fn all_applied(&self) -> bool {
        self.applied() == self.steps.len()
    }
}

/// Run `script` against `markup`.
///
/// `history` is the changelog so far; entries recorded by earlier edits of
/// this run are appended to it for later ones.
pub fn run_script<C: Clock, G: IdGenerator>(
    script: &EditScript,
    markup: &str,
    pipeline: &Pipeline<C, G>,
    history: &[ChangelogEntry],
) -> ScriptRun {
    let mut current = markup.to_string();
    let mut history = history.to_vec();
    let mut steps = Vec::with_capacity(script.edits.len());
    let mut entries = Vec::new();

    for edit in &script.edits {
        let request = edit.to_request();
        let outcome = pipeline.run(&current, &request, &history);

        let step = match outcome.status {
            EditStatus::Applied { .. } => {
                current = outcome.markup;
                StepResult::Applied {
                    repair: outcome.report,
                }
            }
            EditStatus::NoMatch { suggestion } => StepResult::NoMatch { suggestion },
            EditStatus::Failed { reason } => StepResult::Failed { reason },
        };
        debug!(edit = %edit.id, result = %step, "script step finished");

        if let Some(entry) = outcome.entry {
            history.push(entry.clone());
            entries.push(entry);
        }
        steps.push((edit.id.clone(), step));
    }

    ScriptRun {
        markup: current,
        steps,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_script_from_str;

    const PAGE: &str = r#"<body><section id="hero">Hero</section><section id="promo">Sale</section><footer>Foot</footer></body>"#;

    #[test]
    fn edits_thread_markup_in_order() {
        let script = load_script_from_str(
            r##"
[[edits]]
id = "drop-promo"
operation = { type = "delete", target = "#promo" }

[[edits]]
id = "quotes"
voice = true
operation = { type = "insert", target = "footer", content = "<section id=\"quotes\">Q</section>" }
parameters = { type = "testimonials", location = "above footer" }

[[edits]]
id = "again"
operation = { type = "delete", target = "#promo" }
"##,
        )
        .unwrap();

        let run = run_script(&script, PAGE, &Pipeline::default(), &[]);
        assert_eq!(
            run.markup,
            r#"<body><section id="hero">Hero</section><section id="quotes">Q</section><footer>Foot</footer></body>"#
        );
        assert_eq!(run.applied(), 2);
        assert!(!run.all_applied());
        assert_eq!(run.steps[2].0, "again");
        assert_eq!(run.steps[2].1, StepResult::NoMatch { suggestion: None });

        let texts: Vec<&str> = run.entries.iter().map(|e| e.entry.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Deleted #promo", "[Voice] Inserted testimonials above footer"]
        );
    }

    #[test]
    fn step_display() {
        assert_eq!(
            StepResult::NoMatch {
                suggestion: Some("hero".into())
            }
            .to_string(),
            "No match (did you mean #hero?)"
        );
        assert_eq!(
            StepResult::Failed {
                reason: "boom".into()
            }
            .to_string(),
            "Failed: boom"
        );
    }
}
