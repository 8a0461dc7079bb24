use html_patcher::config::EditorSettings;
use html_patcher::dom::parse;
use html_patcher::{apply, validate_and_repair, Operation, Position, Repairer};
use proptest::prelude::*;

/// Section bodies that are never blank.
fn arb_text() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,10}"
}

fn render(sections: &[(String, String)], footer: bool) -> String {
    let mut html = String::from("<html><body>\n");
    for (id, text) in sections {
        html.push_str(&format!(
            "  <section id=\"{id}\">{text}<div><span id=\"{id}-in\">{text}</span></div></section>\n"
        ));
    }
    if footer {
        html.push_str("  <footer>Contact</footer>\n");
    }
    html.push_str("</body></html>");
    html
}

/// Sections with unique ids `s0..sN`.
fn numbered(texts: &[String]) -> Vec<(String, String)> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| (format!("s{i}"), text.clone()))
        .collect()
}

fn section_ids(markup: &str) -> Vec<String> {
    let doc = parse(markup).unwrap();
    doc.elements_by_tag("section")
        .filter_map(|id| doc.element(id).and_then(|el| el.id()).map(str::to_string))
        .collect()
}

proptest! {
    /// A selector that matches nothing hands back the input byte for byte,
    /// however broken the input is.
    #[test]
    fn prop_locator_miss_is_identity(markup in "\\PC{0,80}", insert in any::<bool>()) {
        let op = if insert {
            Operation::insert("#no-such-id-9", "<p>x</p>", Position::After)
        } else {
            Operation::delete("#no-such-id-9")
        };
        prop_assert_eq!(apply(&markup, &op), markup);
    }

    /// Deleting a section removes it and everything nested in it; the others
    /// keep their order.
    #[test]
    fn prop_delete_removes_subtree(
        texts in prop::collection::vec(arb_text(), 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let sections = numbered(&texts);
        let victim = pick.index(sections.len());
        let markup = render(&sections, true);

        let out = apply(&markup, &Operation::delete(format!("#s{victim}")));

        let expected: Vec<String> = sections
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != victim)
            .map(|(_, (id, _))| id.clone())
            .collect();
        prop_assert_eq!(section_ids(&out), expected);
        let victim_id = format!("id=\"s{victim}\"");
        prop_assert!(!out.contains(&victim_id));

        let inner_id = format!("id=\"s{victim}-in\"");
        prop_assert!(!out.contains(&inner_id));
        let doc = parse(&out).unwrap();
        prop_assert_eq!(doc.elements_by_tag("span").count(), sections.len() - 1);
        prop_assert_eq!(doc.elements_by_tag("div").count(), sections.len() - 1);
    }

    /// Repairing a healthy page changes nothing, twice over.
    #[test]
    fn prop_healthy_repair_is_idempotent(texts in prop::collection::vec(arb_text(), 0..6)) {
        let markup = render(&numbered(&texts), true);

        let first = validate_and_repair(&markup, &[]);
        prop_assert!(first.success);
        prop_assert_eq!(&first.repaired_dom, &markup);

        let second = validate_and_repair(&first.repaired_dom, &[]);
        prop_assert!(second.success);
        prop_assert_eq!(second.repaired_dom, first.repaired_dom);
    }

    /// With duplicate re-scan on, one repair pass leaves nothing to fix.
    #[test]
    fn prop_rescan_repair_converges(
        sections in prop::collection::vec(("[abc]", "[a-z ]{0,4}"), 0..7),
        footer in any::<bool>(),
    ) {
        let mut settings = EditorSettings::default();
        settings.repair.rescan_duplicates = true;
        let repairer = Repairer::new(settings);

        let markup = render(&sections, footer);
        let first = repairer.validate_and_repair(&markup, &[]);
        let second = repairer.validate_and_repair(&first.repaired_dom, &[]);

        prop_assert!(second.success, "second pass found: {}", second.message);
        let ids = section_ids(&first.repaired_dom);
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(ids.len(), unique.len());
    }
}
