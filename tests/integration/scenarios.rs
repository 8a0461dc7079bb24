use html_patcher::changelog::{ChangelogRecorder, ExecutionLog};
use html_patcher::dom::parse;
use html_patcher::{apply, generate_changelog_entry, validate_and_repair, Operation, Position};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

#[test]
fn duplicate_id_convergence() {
    let markup = r#"<body><section id="x">One</section><section id="x">Two</section><footer>F</footer></body>"#;
    let report = validate_and_repair(markup, &[]);

    assert!(!report.success);
    assert_eq!(report.issues.len(), 1);
    assert!(report.message.contains("Duplicate section id: x"));

    let doc = parse(&report.repaired_dom).unwrap();
    let ids: Vec<&str> = doc
        .elements_by_tag("section")
        .filter_map(|id| doc.element(id).and_then(|el| el.id()))
        .collect();
    assert_eq!(ids, vec!["x", "x_dup"]);
}

#[test]
fn missing_footer_auto_repair() {
    let markup = r#"<html><body><section id="hero">Hello</section></body></html>"#;
    let report = validate_and_repair(markup, &[]);

    assert!(!report.success);
    assert!(report.message.contains("Missing"));
    assert_eq!(report.repair_action, "Added missing <footer> element.");

    let doc = parse(&report.repaired_dom).unwrap();
    let footers: Vec<_> = doc.elements_by_tag("footer").collect();
    assert_eq!(footers.len(), 1);
    assert_eq!(doc.text_content(footers[0]), "Footer added by repair agent.");
}

#[test]
fn template_fidelity() {
    let log = ExecutionLog::new(
        "insert",
        params(json!({"type": "testimonials", "location": "above footer"})),
    );

    let plain = generate_changelog_entry(&log, false);
    assert_eq!(plain.entry, "Inserted testimonials above footer");
    assert!(!plain.is_voice_edit);

    let voiced = generate_changelog_entry(&log, true);
    assert_eq!(voiced.entry, "[Voice] Inserted testimonials above footer");
    assert!(voiced.is_voice_edit);
}

#[test]
fn rollback_ids_are_unique() {
    let recorder = ChangelogRecorder::new();
    let log = ExecutionLog::new("delete", params(json!({"target_selector": "#promo"})));

    let ids: HashSet<_> = (0..1000)
        .map(|_| recorder.record(&log, false).rollback_id)
        .collect();
    assert_eq!(ids.len(), 1000);
}

#[test]
fn deeply_nested_page_is_edited_and_repaired() {
    let depth = 10_000;
    let page = format!(
        "<html><body>{}<section id=\"core\">Deep</section>{}<footer>F</footer></body></html>",
        "<div>".repeat(depth),
        "</div>".repeat(depth)
    );

    let without_footer = apply(&page, &Operation::delete("footer"));
    assert!(!without_footer.contains("<footer>"));
    assert!(without_footer.contains(r#"<section id="core">Deep"#));

    let healthy = validate_and_repair(&page, &[]);
    assert!(healthy.success, "{}", healthy.message);

    let repaired = validate_and_repair(&without_footer, &[]);
    assert!(!repaired.success);
    assert_eq!(repaired.repair_action, "Added missing <footer> element.");
    assert!(repaired
        .repaired_dom
        .contains("<footer>Footer added by repair agent.</footer>"));

    let appended = apply(&page, &Operation::insert("#core", "<p>inner</p>", Position::Append));
    assert!(appended.contains("<p>inner</p>"));
    assert_eq!(appended.matches("<div>").count(), depth);
}
