//! Integration tests for settings files and edit scripts
//!
//! Loads both from disk and runs scripts through the pipeline

use html_patcher::config::{
    load_script_from_path, load_settings_from_path, run_script, ConfigError, EditOperation,
    StepResult,
};
use html_patcher::edit::Position;
use html_patcher::Pipeline;
use std::fs;
use tempfile::TempDir;

const PAGE: &str = r#"<html><body>
<section id="hero">Welcome</section>
<section id="promo">Sale</section>
<footer>Contact</footer>
</body></html>"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_settings_from_file_drive_repair() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "settings.toml",
        r#"
[landmarks]
section_tags = ["section", "article"]
footer_tag = "footer"

[repair]
duplicate_suffix = "-copy"
section_placeholder = "Coming soon."

[changelog]
voice_marker = "[Mic]"
"#,
    );

    let settings = load_settings_from_path(&path).unwrap();
    let pipeline = Pipeline::new(settings);

    let report = pipeline.repairer().validate_and_repair(
        r#"<body><article id="a">x</article><article id="a"></article><footer>F</footer></body>"#,
        &[],
    );
    assert_eq!(
        report.repairs,
        vec![
            "Renamed duplicate article id a to a-copy".to_string(),
            "Filled empty article (id=a-copy) with placeholder content.".to_string(),
        ]
    );
    assert!(report.repaired_dom.contains(r#"<article id="a-copy">Coming soon.</article>"#));
}

#[test]
fn test_settings_errors_carry_path() {
    let dir = TempDir::new().unwrap();
    let bad_toml = write(&dir, "bad.toml", "[repair\nduplicate_suffix = 1");
    let invalid = write(&dir, "invalid.toml", "[landmarks]\nsection_tags = []\n");

    match load_settings_from_path(&bad_toml).unwrap_err() {
        ConfigError::Toml { path, .. } => assert_eq!(path.as_deref(), Some(bad_toml.as_path())),
        other => panic!("expected TOML error, got {other}"),
    }

    let err = load_settings_from_path(&invalid).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { path: Some(_), .. }));
    assert!(err.to_string().contains("invalid.toml"));
    assert!(err.to_string().contains("landmarks.section_tags"));
}

#[test]
fn test_blank_placeholder_is_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "blank.toml", "[repair]\nsection_placeholder = \" \"\n");

    let err = load_settings_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
    assert!(err.to_string().contains("repair.section_placeholder"));
}

#[test]
fn test_script_from_file_runs_in_order() {
    let dir = TempDir::new().unwrap();
    let script_path = write(
        &dir,
        "landing.toml",
        r##"
[meta]
name = "landing-refresh"
description = "Swap the promo for testimonials"

[[edits]]
id = "remove-promo"
operation = { type = "delete", target = "#promo" }

[[edits]]
id = "add-testimonials"
voice = true
parameters = { type = "testimonials", location = "above footer" }

[edits.operation]
type = "insert"
target = "footer"
position = "before"
content = """<section id="testimonials">Loved it.</section>
"""

[[edits]]
id = "retitle"
operation = { type = "replace", target = "#hero", content = "<section id=\"hero\">Hello again</section>" }
"##,
    );

    let script = load_script_from_path(&script_path).unwrap();
    assert_eq!(script.meta.name, "landing-refresh");
    assert!(matches!(
        script.edits[1].operation,
        EditOperation::Insert {
            position: Position::Before,
            ..
        }
    ));

    let run = run_script(&script, PAGE, &Pipeline::default(), &[]);
    assert!(run.all_applied(), "{:?}", run.steps);
    assert_eq!(
        run.markup,
        r#"<html><body>
<section id="hero">Hello again</section>

<section id="testimonials">Loved it.</section>
<footer>Contact</footer>
</body></html>"#
    );

    let entries: Vec<&str> = run.entries.iter().map(|e| e.entry.as_str()).collect();
    assert_eq!(
        entries,
        vec![
            "Deleted #promo",
            "[Voice] Inserted testimonials above footer",
            "Replaced #hero",
        ]
    );
}

#[test]
fn test_script_validation_rejects_bad_selectors() {
    let dir = TempDir::new().unwrap();
    let script_path = write(
        &dir,
        "broken.toml",
        r#"
[[edits]]
id = "x"
operation = { type = "delete", target = "div >" }

[[edits]]
id = "x"
operation = { type = "delete", target = "p" }
"#,
    );

    let err = load_script_from_path(&script_path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("invalid target selector"), "{message}");
    assert!(message.contains("used more than once"), "{message}");
}

#[test]
fn test_script_steps_report_misses() {
    let dir = TempDir::new().unwrap();
    let script_path = write(
        &dir,
        "miss.toml",
        r##"
[[edits]]
id = "typo"
operation = { type = "delete", target = "#her" }
"##,
    );

    let script = load_script_from_path(&script_path).unwrap();
    let run = run_script(&script, PAGE, &Pipeline::default(), &[]);
    assert_eq!(run.markup, PAGE);
    assert!(run.entries.is_empty());
    assert_eq!(
        run.steps,
        vec![(
            "typo".to_string(),
            StepResult::NoMatch {
                suggestion: Some("hero".into())
            }
        )]
    );
}
