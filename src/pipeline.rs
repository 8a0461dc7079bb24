//! One edit request end to end: mutate, validate/repair, record.
//!
//! [`Pipeline`] owns everything the stages need (settings, the repairer and
//! the changelog recorder) and holds no per-document state, so one instance
//! can serve any number of documents concurrently. Callers must still
//! serialize edits to the same document.

use crate::changelog::{
    ChangelogEntry, ChangelogRecorder, Clock, ExecutionLog, IdGenerator, RandomIds, SystemClock,
};
use crate::config::EditorSettings;
use crate::edit::{self, MutationOutcome, Operation};
use crate::repair::{RepairReport, Repairer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Wire form of one edit: operation name, parameters, voice flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditRequest {
    pub operation: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub is_voice_edit: bool,
}

impl EditRequest {
    pub fn new(operation: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            operation: operation.into(),
            parameters,
            is_voice_edit: false,
        }
    }

    pub fn voice(mut self, is_voice_edit: bool) -> Self {
        self.is_voice_edit = is_voice_edit;
        self
    }
}

/// What the mutation stage did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditStatus {
    Applied {
        before_hash: u64,
        after_hash: u64,
        fragment_errors: usize,
    },
    NoMatch {
        suggestion: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl EditStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditStatus::Applied { .. })
    }

    fn to_value(&self) -> Value {
        match self {
            EditStatus::Applied {
                before_hash,
                after_hash,
                fragment_errors,
            } => json!({
                "status": "applied",
                "before_hash": format!("{before_hash:016x}"),
                "after_hash": format!("{after_hash:016x}"),
                "fragment_errors": fragment_errors,
            }),
            EditStatus::NoMatch { suggestion } => json!({
                "status": "no_match",
                "suggestion": suggestion,
            }),
            EditStatus::Failed { reason } => json!({
                "status": "failed",
                "reason": reason,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    /// Final markup: edited, then repaired.
    pub markup: String,
    pub status: EditStatus,
    pub report: RepairReport,
    /// Present only when the edit was applied.
    pub entry: Option<ChangelogEntry>,
}

#[derive(Debug, Clone)]
pub struct Pipeline<C = SystemClock, G = RandomIds> {
    repairer: Repairer,
    recorder: ChangelogRecorder<C, G>,
}

impl Pipeline {
    pub fn new(settings: EditorSettings) -> Self {
        Self::with_sources(settings, SystemClock, RandomIds)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl<C: Clock, G: IdGenerator> Pipeline<C, G> {
    pub fn with_sources(settings: EditorSettings, clock: C, ids: G) -> Self {
        let recorder = ChangelogRecorder::with_sources(clock, ids)
            .voice_marker(settings.changelog.voice_marker.as_str());
        Self {
            repairer: Repairer::new(settings),
            recorder,
        }
    }

    pub fn settings(&self) -> &EditorSettings {
        self.repairer.settings()
    }

    pub fn repairer(&self) -> &Repairer {
        &self.repairer
    }

    pub fn recorder(&self) -> &ChangelogRecorder<C, G> {
        &self.recorder
    }

    /// Run one request against `markup`.
    ///
    /// Never fails: a rejected or unmatched edit leaves the markup as it was
    /// and the outcome says why. Repair always runs.
    pub fn run(&self, markup: &str, request: &EditRequest, history: &[ChangelogEntry]) -> PipelineOutcome {
        let (edited, status) = self.mutate(markup, request);
        let report = self.repairer.validate_and_repair(&edited, history);

        let entry = status.is_applied().then(|| {
            let log = ExecutionLog::new(request.operation.as_str(), request.parameters.clone())
                .with_result(json!({
                    "edit": status.to_value(),
                    "repair": {
                        "success": report.success,
                        "repair_action": report.repair_action,
                        "message": report.message,
                    },
                }));
            self.recorder.record(&log, request.is_voice_edit)
        });

        PipelineOutcome {
            markup: report.repaired_dom.clone(),
            status,
            report,
            entry,
        }
    }

    fn mutate(&self, markup: &str, request: &EditRequest) -> (String, EditStatus) {
        let operation = match Operation::from_parameters(&request.operation, &request.parameters) {
            Ok(operation) => operation,
            Err(err) => {
                warn!(error = %err, operation = %request.operation, "rejected edit request");
                return (
                    markup.to_string(),
                    EditStatus::Failed {
                        reason: err.to_string(),
                    },
                );
            }
        };

        match edit::try_apply(markup, &operation) {
            Ok(MutationOutcome::Applied {
                markup: updated,
                before_hash,
                after_hash,
                fragment_errors,
                ..
            }) => (
                updated,
                EditStatus::Applied {
                    before_hash,
                    after_hash,
                    fragment_errors,
                },
            ),
            Ok(MutationOutcome::NoMatch { selector, suggestion }) => {
                debug!(%selector, ?suggestion, "edit target not found");
                (markup.to_string(), EditStatus::NoMatch { suggestion })
            }
            Err(err) => {
                warn!(error = %err, "edit failed; keeping original markup");
                (
                    markup.to_string(),
                    EditStatus::Failed {
                        reason: err.to_string(),
                    },
                )
            }
        }
    }
}
