use crate::dom::node::{Document, Element, NodeData, NodeId};

/// Elements that never have an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

impl Document {
    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let mut pending: Vec<Step> = self
            .children(NodeId::ROOT)
            .iter()
            .rev()
            .map(|&child| Step::Open(child))
            .collect();

        while let Some(step) = pending.pop() {
            match step {
                Step::Open(id) => self.open_node(id, &mut out, &mut pending),
                Step::Close(id) => {
                    if let Some(el) = self.element(id) {
                        out.push_str("</");
                        out.push_str(&el.name);
                        out.push('>');
                    }
                }
            }
        }
        out
    }

    fn open_node(&self, id: NodeId, out: &mut String, pending: &mut Vec<Step>) {
        let children = self.children(id);
        match self.data(id) {
            NodeData::Document => {}
            NodeData::Element(el) => {
                write_open_tag(el, children.is_empty(), out);
                if children.is_empty() && (el.self_closing || is_void(&el.name)) {
                    return;
                }
                pending.push(Step::Close(id));
            }
            NodeData::Text(raw) | NodeData::Comment(raw) | NodeData::Doctype(raw) => {
                out.push_str(raw);
                return;
            }
        }
        pending.extend(children.iter().rev().map(|&child| Step::Open(child)));
    }
}

/// Explicit serializer stack entry, so deep trees do not recurse.
enum Step {
    Open(NodeId),
    Close(NodeId),
}

fn write_open_tag(el: &Element, empty: bool, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
    }
    if el.self_closing && empty {
        out.push_str("/>");
    } else {
        out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::parse;

    fn roundtrip(source: &str) -> String {
        parse(source).unwrap().to_html()
    }

    #[test]
    fn well_formed_markup_is_preserved() {
        let source = r#"<!DOCTYPE html>
<html>
  <body>
    <!-- hero -->
    <section id="hero" class="wide">Tom &amp; Jerry<br>next</section>
    <img src="a.png"/>
    <footer>Contact</footer>
  </body>
</html>
"#;
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn implicit_end_tags_become_explicit() {
        assert_eq!(roundtrip("<ul><li>one<li>two</ul>"), "<ul><li>one</li><li>two</li></ul>");
    }

    #[test]
    fn single_quotes_normalize_to_double() {
        assert_eq!(
            roundtrip(r#"<a title='say "hi"' href=x>y</a>"#),
            r#"<a title="say &quot;hi&quot;" href="x">y</a>"#
        );
    }

    #[test]
    fn serialization_is_a_fixed_point() {
        let messy = "<div class=a><p>one<p>two</div><span title='q'>z";
        let once = roundtrip(messy);
        assert_eq!(roundtrip(&once), once);
    }

    #[test]
    fn valueless_attribute_stays_bare() {
        assert_eq!(roundtrip("<input disabled>"), "<input disabled>");
    }

    #[test]
    fn deeply_nested_markup_serializes() {
        let depth = 10_000;
        let source = format!("{}x{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let once = roundtrip(&source);

        assert_eq!(once.matches("<div>").count(), depth);
        assert_eq!(once.matches("</div>").count(), depth);
        assert!(once.contains('x'));
        assert_eq!(roundtrip(&once), once);
    }
}
