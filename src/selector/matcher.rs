use super::{
    AttrOperator, Combinator, ComplexSelector, CompoundSelector, Nth, Selector, SimpleSelector,
};
use crate::dom::{Document, Element, NodeId};

/// Minimum Jaro-Winkler similarity for an id to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

impl Selector {
    /// Whether the element `id` matches any alternative of this selector.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|complex| matches_complex(doc, id, complex))
    }
}

impl Document {
    /// First attached element in document order matching `selector`.
    pub fn select_first(&self, selector: &Selector) -> Option<NodeId> {
        self.elements().find(|&id| selector.matches(self, id))
    }

    /// All attached elements matching `selector`, in document order.
    pub fn select_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.elements()
            .filter(|&id| selector.matches(self, id))
            .collect()
    }
}

/// Closest id in `doc` to `wanted`, for locator-miss hints.
pub fn suggest_id(doc: &Document, wanted: &str) -> Option<String> {
    doc.elements()
        .filter_map(|id| doc.element(id).and_then(Element::id))
        .filter(|candidate| *candidate != wanted)
        .map(|candidate| (strsim::jaro_winkler(wanted, candidate), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

fn matches_complex(doc: &Document, id: NodeId, complex: &ComplexSelector) -> bool {
    match complex.compounds.len() {
        0 => false,
        n => match_at(doc, id, complex, n - 1),
    }
}

/// Right-to-left match of `complex.compounds[..=index]` ending at `id`.
fn match_at(doc: &Document, id: NodeId, complex: &ComplexSelector, index: usize) -> bool {
    if !matches_compound(doc, id, &complex.compounds[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }

    let next = index - 1;
    match complex.combinators[next] {
        Combinator::Child => {
            parent_element(doc, id).is_some_and(|parent| match_at(doc, parent, complex, next))
        }
        Combinator::Descendant => {
            let mut current = parent_element(doc, id);
            while let Some(ancestor) = current {
                if match_at(doc, ancestor, complex, next) {
                    return true;
                }
                current = parent_element(doc, ancestor);
            }
            false
        }
        Combinator::NextSibling => preceding_elements(doc, id)
            .last()
            .is_some_and(|&sibling| match_at(doc, sibling, complex, next)),
        Combinator::SubsequentSibling => preceding_elements(doc, id)
            .iter()
            .any(|&sibling| match_at(doc, sibling, complex, next)),
    }
}

fn matches_compound(doc: &Document, id: NodeId, compound: &CompoundSelector) -> bool {
    let Some(el) = doc.element(id) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if !el.name.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    compound
        .simple
        .iter()
        .all(|simple| matches_simple(doc, id, el, simple))
}

fn matches_simple(doc: &Document, id: NodeId, el: &Element, simple: &SimpleSelector) -> bool {
    match simple {
        SimpleSelector::Id(wanted) => el.id() == Some(wanted.as_str()),
        SimpleSelector::Class(wanted) => el.classes().any(|c| c == wanted.as_str()),
        SimpleSelector::Attribute { name, matcher } => match (el.attr(name), matcher) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some((operator, expected))) => {
                matches_attr(actual, *operator, expected)
            }
        },
        SimpleSelector::FirstChild => preceding_elements(doc, id).is_empty(),
        SimpleSelector::LastChild => following_element_count(doc, id) == 0,
        SimpleSelector::OnlyChild => {
            preceding_elements(doc, id).is_empty() && following_element_count(doc, id) == 0
        }
        SimpleSelector::NthChild(nth) => {
            let position = preceding_elements(doc, id).len() + 1;
            match nth {
                Nth::Index(n) => position == *n,
                Nth::Odd => position % 2 == 1,
                Nth::Even => position % 2 == 0,
            }
        }
    }
}

fn matches_attr(actual: &str, operator: AttrOperator, expected: &str) -> bool {
    match operator {
        AttrOperator::Equals => actual == expected,
        AttrOperator::Includes => actual.split_ascii_whitespace().any(|v| v == expected),
        AttrOperator::DashMatch => {
            actual == expected
                || actual
                    .strip_prefix(expected)
                    .is_some_and(|rest| rest.starts_with('-'))
        }
        AttrOperator::Prefix => !expected.is_empty() && actual.starts_with(expected),
        AttrOperator::Suffix => !expected.is_empty() && actual.ends_with(expected),
        AttrOperator::Substring => !expected.is_empty() && actual.contains(expected),
    }
}

fn parent_element(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.parent(id).filter(|&parent| doc.element(parent).is_some())
}

/// Element siblings before `id`, in document order.
fn preceding_elements(doc: &Document, id: NodeId) -> Vec<NodeId> {
    let Some(parent) = doc.parent(id) else {
        return Vec::new();
    };
    doc.element_children(parent)
        .take_while(|&sibling| sibling != id)
        .collect()
}

fn following_element_count(doc: &Document, id: NodeId) -> usize {
    let Some(parent) = doc.parent(id) else {
        return 0;
    };
    doc.element_children(parent)
        .skip_while(|&sibling| sibling != id)
        .skip(1)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse;

    const PAGE: &str = r#"<body>
<header id="top"><nav class="main menu"><a href="https://x.dev/a" lang="en-US">A</a></nav></header>
<main>
  <section id="hero" class="wide">Hero</section>
  <section id="features" data-kind="list"><ul><li>1</li><li>2</li><li>3</li></ul></section>
  <section id="pricing">Pricing</section>
</main>
<footer id="contact">Contact</footer>
</body>"#;

    fn ids(doc: &Document, selector: &str) -> Vec<String> {
        let selector = Selector::parse(selector).unwrap();
        doc.select_all(&selector)
            .into_iter()
            .map(|id| {
                let el = doc.element(id).unwrap();
                el.id().map(str::to_string).unwrap_or_else(|| el.name.clone())
            })
            .collect()
    }

    #[test]
    fn type_id_and_class() {
        let doc = parse(PAGE).unwrap();
        assert_eq!(ids(&doc, "section"), vec!["hero", "features", "pricing"]);
        assert_eq!(ids(&doc, "#pricing"), vec!["pricing"]);
        assert_eq!(ids(&doc, "SECTION.wide"), vec!["hero"]);
        assert_eq!(ids(&doc, ".menu"), vec!["nav"]);
    }

    #[test]
    fn combinators() {
        let doc = parse(PAGE).unwrap();
        assert_eq!(ids(&doc, "main > section:first-child"), vec!["hero"]);
        assert_eq!(ids(&doc, "body section li:last-child"), vec!["li"]);
        assert_eq!(ids(&doc, "#hero + section"), vec!["features"]);
        assert_eq!(ids(&doc, "#hero ~ section"), vec!["features", "pricing"]);
        assert!(ids(&doc, "body > section").is_empty());
    }

    #[test]
    fn attributes() {
        let doc = parse(PAGE).unwrap();
        assert_eq!(ids(&doc, "[data-kind]"), vec!["features"]);
        assert_eq!(ids(&doc, "a[href^=https]"), vec!["a"]);
        assert_eq!(ids(&doc, "a[href$='/a']"), vec!["a"]);
        assert_eq!(ids(&doc, "a[lang|=en]"), vec!["a"]);
        assert_eq!(ids(&doc, "[class~=main]"), vec!["nav"]);
        assert!(ids(&doc, "[class=main]").is_empty());
    }

    #[test]
    fn nth_child() {
        let doc = parse(PAGE).unwrap();
        let selector = Selector::parse("li:nth-child(2)").unwrap();
        let li = doc.select_first(&selector).unwrap();
        assert_eq!(doc.text_content(li), "2");
        assert_eq!(ids(&doc, "li:nth-child(odd)").len(), 2);
    }

    #[test]
    fn first_match_in_document_order() {
        let doc = parse(PAGE).unwrap();
        let selector = Selector::parse("footer, section").unwrap();
        let first = doc.select_first(&selector).unwrap();
        assert_eq!(doc.element(first).unwrap().id(), Some("hero"));
    }

    #[test]
    fn suggestion_for_near_miss() {
        let doc = parse(PAGE).unwrap();
        assert_eq!(suggest_id(&doc, "featurs").as_deref(), Some("features"));
        assert_eq!(suggest_id(&doc, "zzz"), None);
    }
}
