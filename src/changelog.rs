//! Changelog entries for applied edits.
//!
//! An [`ExecutionLog`] describes what ran; [`ChangelogRecorder`] turns it
//! into a one-line human-readable [`ChangelogEntry`] stamped with a UTC
//! timestamp and a fresh rollback id. Time and id sources are injected so
//! entries can be reproduced exactly in tests.

use crate::edit::{param_str, OperationKind};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Marker prepended to voice-triggered entries.
pub const DEFAULT_VOICE_MARKER: &str = "[Voice]";

const UNKNOWN_OPERATION: &str = "unknown operation";

/// Record of one executed operation, as handed over by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLog {
    pub operation: Option<String>,
    pub parameters: Map<String, Value>,
    /// Free-form outcome detail. Not used for the entry text.
    pub result: Value,
}

impl ExecutionLog {
    pub fn new(operation: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            operation: Some(operation.into()),
            parameters,
            result: Value::Null,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    pub fn kind(&self) -> OperationKind {
        OperationKind::parse(self.operation.as_deref().unwrap_or(UNKNOWN_OPERATION))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub entry: String,
    /// ISO-8601 UTC, e.g. `2024-05-01T12:00:00.000000Z`
    pub timestamp: String,
    pub rollback_id: Uuid,
    pub is_voice_edit: bool,
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub trait IdGenerator {
    fn next_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Random (v4) rollback ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[derive(Debug, Clone)]
pub struct ChangelogRecorder<C = SystemClock, G = RandomIds> {
    clock: C,
    ids: G,
    voice_marker: String,
}

impl ChangelogRecorder {
    pub fn new() -> Self {
        Self::with_sources(SystemClock, RandomIds)
    }
}

impl Default for ChangelogRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock, G: IdGenerator> ChangelogRecorder<C, G> {
    pub fn with_sources(clock: C, ids: G) -> Self {
        Self {
            clock,
            ids,
            voice_marker: DEFAULT_VOICE_MARKER.to_string(),
        }
    }

    pub fn voice_marker(mut self, marker: impl Into<String>) -> Self {
        self.voice_marker = marker.into();
        self
    }

    pub fn record(&self, log: &ExecutionLog, is_voice_edit: bool) -> ChangelogEntry {
        let mut entry = describe(log);
        if is_voice_edit {
            entry = format!("{} {}", self.voice_marker, entry);
        }

        let entry = ChangelogEntry {
            entry,
            timestamp: format_timestamp(self.clock.now()),
            rollback_id: self.ids.next_id(),
            is_voice_edit,
        };
        info!(
            entry = %entry.entry,
            rollback_id = %entry.rollback_id,
            "recorded changelog entry"
        );
        entry
    }
}

/// The entry text for `log`, without any voice marker.
pub fn describe(log: &ExecutionLog) -> String {
    let params = &log.parameters;
    let or = |key: &str, fallback: &str| param_str(params, key).unwrap_or_else(|| fallback.to_string());

    match log.kind() {
        OperationKind::Insert => {
            let text = format!("Inserted {} {}", or("type", "block"), or("location", ""));
            text.trim().to_string()
        }
        OperationKind::Delete => format!("Deleted {}", or("target_selector", "element")),
        OperationKind::Replace => format!("Replaced {}", or("target_selector", "element")),
        OperationKind::Other(name) => format!("Performed {name}"),
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Entry with the system clock, a random rollback id and the default marker.
pub fn generate_changelog_entry(log: &ExecutionLog, is_voice_edit: bool) -> ChangelogEntry {
    ChangelogRecorder::new().record(log, is_voice_edit)
}

#[derive(Error, Debug)]
pub enum ChangelogError {
    #[error("failed to access changelog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid changelog entry at {}:{line}: {source}", .path.display())]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Append `entry` to a JSON-lines changelog, creating the file if needed.
pub fn append_jsonl(path: impl AsRef<Path>, entry: &ChangelogEntry) -> Result<(), ChangelogError> {
    let path = path.as_ref();
    let io_err = |source| ChangelogError::Io {
        path: path.to_path_buf(),
        source,
    };

    let line = serde_json::to_string(entry).map_err(|source| ChangelogError::Json {
        path: path.to_path_buf(),
        line: 0,
        source,
    })?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    writeln!(file, "{line}").map_err(io_err)?;
    file.sync_all().map_err(io_err)
}

/// Read every entry from a JSON-lines changelog. Blank lines are skipped.
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<ChangelogEntry>, ChangelogError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ChangelogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| ChangelogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|source| ChangelogError::Json {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
        }
    }

    #[derive(Default)]
    struct SequentialIds(Cell<u128>);

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> Uuid {
            let next = self.0.get() + 1;
            self.0.set(next);
            Uuid::from_u128(next)
        }
    }

    fn log(operation: &str, params: Value) -> ExecutionLog {
        let Value::Object(params) = params else {
            panic!("expected object");
        };
        ExecutionLog::new(operation, params)
    }

    #[test]
    fn insert_template() {
        let entry = describe(&log(
            "insert",
            json!({"type": "testimonials", "location": "above footer"}),
        ));
        assert_eq!(entry, "Inserted testimonials above footer");
        assert_eq!(describe(&log("insert", json!({}))), "Inserted block");
    }

    #[test]
    fn delete_and_replace_templates() {
        assert_eq!(
            describe(&log("delete", json!({"target_selector": "#promo"}))),
            "Deleted #promo"
        );
        assert_eq!(describe(&log("delete", json!({}))), "Deleted element");
        assert_eq!(
            describe(&log("replace", json!({"target_selector": null}))),
            "Replaced element"
        );
    }

    #[test]
    fn other_and_missing_operations() {
        assert_eq!(describe(&log("move", json!({}))), "Performed move");
        assert_eq!(
            describe(&ExecutionLog::default()),
            "Performed unknown operation"
        );
    }

    #[test]
    fn non_string_parameters_use_json_text() {
        assert_eq!(
            describe(&log("insert", json!({"type": 3, "location": true}))),
            "Inserted 3 true"
        );
    }

    #[test]
    fn recorder_uses_injected_sources() {
        let recorder = ChangelogRecorder::with_sources(FixedClock, SequentialIds::default());
        let first = recorder.record(&log("delete", json!({"target_selector": "#a"})), true);
        let second = recorder.record(&log("delete", json!({"target_selector": "#b"})), false);

        assert_eq!(first.entry, "[Voice] Deleted #a");
        assert!(first.is_voice_edit);
        assert_eq!(first.timestamp, "2024-05-01T12:30:00.000000Z");
        assert_eq!(first.rollback_id, Uuid::from_u128(1));
        assert_eq!(second.entry, "Deleted #b");
        assert_eq!(second.rollback_id, Uuid::from_u128(2));
    }

    #[test]
    fn custom_voice_marker() {
        let recorder = ChangelogRecorder::new().voice_marker("(voice)");
        let entry = recorder.record(&log("replace", json!({"target_selector": "h1"})), true);
        assert_eq!(entry.entry, "(voice) Replaced h1");
    }

    #[test]
    fn default_entry_shape() {
        let entry = generate_changelog_entry(&log("insert", json!({})), false);
        assert!(entry.timestamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
        assert_eq!(entry.rollback_id.get_version_num(), 4);
    }

    #[test]
    fn execution_log_deserializes_with_defaults() {
        let parsed: ExecutionLog = serde_json::from_str(r#"{"parameters": {"type": "hero"}}"#).unwrap();
        assert_eq!(parsed.operation, None);
        assert_eq!(parsed.result, Value::Null);
        assert_eq!(describe(&parsed), "Performed unknown operation");
    }

    #[test]
    fn jsonl_roundtrip_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("changes.jsonl");
        let recorder = ChangelogRecorder::with_sources(FixedClock, SequentialIds::default());

        let a = recorder.record(&log("delete", json!({"target_selector": "#a"})), false);
        let b = recorder.record(&log("insert", json!({"type": "faq"})), true);
        append_jsonl(&path, &a).unwrap();
        append_jsonl(&path, &b).unwrap();

        assert_eq!(read_jsonl(&path).unwrap(), vec![a, b]);
    }

    #[test]
    fn jsonl_reports_bad_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("changes.jsonl");
        std::fs::write(&path, "\nnot json\n").unwrap();

        match read_jsonl(&path) {
            Err(ChangelogError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected json error, got {other:?}"),
        }
    }
}
