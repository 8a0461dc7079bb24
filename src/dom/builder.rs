//! CST → [`Document`] conversion.
//!
//! tree-sitter's HTML grammar treats whitespace as extras and splits text
//! around entities, so text is not taken from `text` nodes. Instead every
//! source range between two structural children becomes one raw text node.
//! That keeps whitespace and entities exactly as written.

use crate::dom::node::{Attribute, Document, Element, NodeData, NodeId};
use crate::pool;
use crate::ts::TreeSitterError;
use tree_sitter::Node as TsNode;

/// Parse markup into a [`Document`]. Never fails on malformed markup.
pub fn parse(source: &str) -> Result<Document, TreeSitterError> {
    let tree = pool::with_parser(|parser| parser.parse(source))??;
    let mut builder = Builder {
        source,
        doc: Document::new(),
    };

    let root = tree.root_node();
    let mut cursor = root.walk();
    let children: Vec<TsNode<'_>> = root.children(&mut cursor).collect();

    let mut pending = Vec::new();
    schedule(&mut pending, NodeId::ROOT, &children, 0, source.len());
    while let Some(task) = pending.pop() {
        match task {
            Task::Text { parent, start, end } => builder.text(parent, start, end),
            Task::Node { parent, node } => builder.node(parent, node, &mut pending),
        }
    }

    Ok(builder.doc)
}

/// Deferred build step. Tasks are popped in document order, so nesting
/// depth costs heap, not call stack.
enum Task<'t> {
    Text { parent: NodeId, start: usize, end: usize },
    Node { parent: NodeId, node: TsNode<'t> },
}

/// Queue the children of `parent` from `nodes`, which cover `start..end`.
fn schedule<'t>(
    pending: &mut Vec<Task<'t>>,
    parent: NodeId,
    nodes: &[TsNode<'t>],
    start: usize,
    end: usize,
) {
    let mut tasks = Vec::with_capacity(nodes.len() * 2 + 1);
    let mut pos = start;
    for node in nodes {
        if !is_structural(node.kind()) {
            continue;
        }
        tasks.push(Task::Text {
            parent,
            start: pos,
            end: node.start_byte(),
        });
        tasks.push(Task::Node {
            parent,
            node: *node,
        });
        pos = pos.max(node.end_byte());
    }
    tasks.push(Task::Text {
        parent,
        start: pos,
        end,
    });
    pending.extend(tasks.into_iter().rev());
}

struct Builder<'s> {
    source: &'s str,
    doc: Document,
}

impl<'s> Builder<'s> {
    fn node<'t>(&mut self, parent: NodeId, node: TsNode<'t>, pending: &mut Vec<Task<'t>>) {
        match node.kind() {
            "element" => self.element(parent, node, pending),
            "script_element" | "style_element" => self.raw_element(parent, node, pending),
            "comment" => self.raw(parent, node, NodeData::Comment),
            "doctype" => self.raw(parent, node, NodeData::Doctype),
            "start_tag" | "self_closing_tag" => {
                // A tag the grammar could not wrap in an element.
                let el = self.open_tag(node);
                let id = self.doc.create_element(el);
                self.doc.append_child(parent, id);
            }
            "ERROR" => {
                let mut cursor = node.walk();
                let inner: Vec<TsNode<'t>> = node.children(&mut cursor).collect();
                schedule(pending, parent, &inner, node.start_byte(), node.end_byte());
            }
            // Stray end tags are dropped.
            _ => {}
        }
    }

    fn element<'t>(&mut self, parent: NodeId, node: TsNode<'t>, pending: &mut Vec<Task<'t>>) {
        let mut cursor = node.walk();
        let children: Vec<TsNode<'t>> = node.children(&mut cursor).collect();
        let Some(open) = children
            .first()
            .filter(|c| matches!(c.kind(), "start_tag" | "self_closing_tag"))
        else {
            schedule(pending, parent, &children, node.start_byte(), node.end_byte());
            return;
        };

        let el = self.open_tag(*open);
        let id = self.doc.create_element(el);
        self.doc.append_child(parent, id);
        if open.kind() == "self_closing_tag" {
            return;
        }

        let (inner, close) = split_close(&children[1..]);
        let start = open.end_byte();
        let end = match close {
            Some(close) => close.start_byte(),
            None => inner.last().map_or(start, |n| n.end_byte()),
        };
        schedule(pending, id, inner, start, end.max(start));
    }

    /// `script` and `style` bodies are kept verbatim as a single text node.
    fn raw_element<'t>(&mut self, parent: NodeId, node: TsNode<'t>, pending: &mut Vec<Task<'t>>) {
        let mut cursor = node.walk();
        let children: Vec<TsNode<'t>> = node.children(&mut cursor).collect();
        let Some(open) = children.first().filter(|c| c.kind() == "start_tag") else {
            schedule(pending, parent, &children, node.start_byte(), node.end_byte());
            return;
        };

        let el = self.open_tag(*open);
        let id = self.doc.create_element(el);
        self.doc.append_child(parent, id);

        let (inner, close) = split_close(&children[1..]);
        let start = open.end_byte();
        let end = match close {
            Some(close) => close.start_byte(),
            None => inner.last().map_or(start, |n| n.end_byte()),
        };
        self.text(id, start, end.max(start));
    }

    fn raw(&mut self, parent: NodeId, node: TsNode<'_>, wrap: fn(String) -> NodeData) {
        let text = self.source[node.byte_range()].to_string();
        let id = self.doc.push(wrap(text));
        self.doc.append_child(parent, id);
    }

    fn text(&mut self, parent: NodeId, start: usize, end: usize) {
        if start >= end {
            return;
        }
        if let Some(text) = self.source.get(start..end) {
            let id = self.doc.create_text(text);
            self.doc.append_child(parent, id);
        }
    }

    /// Read tag name and attributes from a `start_tag` or `self_closing_tag`.
    fn open_tag(&self, tag: TsNode<'_>) -> Element {
        let mut element = Element::new("");
        element.self_closing = tag.kind() == "self_closing_tag";

        let mut cursor = tag.walk();
        for child in tag.named_children(&mut cursor) {
            match child.kind() {
                "tag_name" => element.name = self.slice(child).to_ascii_lowercase(),
                "attribute" => {
                    let attr = self.attribute(child);
                    // First occurrence wins, as in browsers.
                    if !element.has_attr(&attr.name) {
                        element.attributes.push(attr);
                    }
                }
                _ => {}
            }
        }
        element
    }

    fn attribute(&self, node: TsNode<'_>) -> Attribute {
        let mut name = String::new();
        let mut value = None;

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "attribute_name" => name = self.slice(child).to_ascii_lowercase(),
                "attribute_value" => value = Some(self.slice(child).to_string()),
                "quoted_attribute_value" => {
                    let mut inner = child.walk();
                    let text = child
                        .named_children(&mut inner)
                        .find(|n| n.kind() == "attribute_value")
                        .map(|n| self.slice(n).to_string());
                    value = Some(text.unwrap_or_default());
                }
                _ => {}
            }
        }
        Attribute { name, value }
    }

    fn slice(&self, node: TsNode<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }
}

fn is_structural(kind: &str) -> bool {
    matches!(
        kind,
        "element"
            | "script_element"
            | "style_element"
            | "comment"
            | "doctype"
            | "start_tag"
            | "self_closing_tag"
            | "end_tag"
            | "erroneous_end_tag"
            | "ERROR"
    )
}

/// Split an element's remaining children into content and its own end tag.
fn split_close<'a, 't>(rest: &'a [TsNode<'t>]) -> (&'a [TsNode<'t>], Option<&'a TsNode<'t>>) {
    match rest.split_last() {
        Some((last, inner)) if last.kind() == "end_tag" => (inner, Some(last)),
        _ => (rest, None),
    }
}
