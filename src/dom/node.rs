use std::fmt;

/// Index of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The document root. Always present, never detached.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single attribute. `value` is `None` for valueless attributes such as
/// `disabled`. Values are kept as written (entities are not decoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name.
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Written as `<name/>` in the source.
    pub self_closing: bool,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            self_closing: false,
        }
    }

    /// Attribute value, `Some("")` for valueless attributes.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Set an attribute, overwriting an existing key in place.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_ascii_lowercase(),
                value,
            }),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(Element),
    /// Raw text as it appeared in the source, whitespace included.
    Text(String),
    /// Full comment markup, `<!--` and `-->` included.
    Comment(String),
    /// Full doctype markup.
    Doctype(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// An ordered, rooted HTML tree.
///
/// Nodes live in an arena owned by the document; parents own their children
/// through the `children` lists and children point back through a
/// non-owning `parent` index. Detached nodes stay in the arena but are
/// unreachable from [`NodeId::ROOT`].
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Panics if `id` was not produced by this document.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children only, in order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.element(child).is_some())
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == NodeId::ROOT {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// All nodes below `id` in document order, `id` itself excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Attached elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(NodeId::ROOT)
            .into_iter()
            .filter(|&id| self.element(id).is_some())
    }

    /// Attached elements with the given tag name, in document order.
    pub fn elements_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements()
            .filter(move |&id| self.element(id).is_some_and(|el| el.name.eq_ignore_ascii_case(tag)))
    }

    pub fn find_first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.elements_by_tag(tag).next()
    }

    /// Concatenated text below `id` with common entities decoded.
    ///
    /// Comments and doctypes do not contribute.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut raw = String::new();
        if let NodeData::Text(text) = self.data(id) {
            raw.push_str(text);
        }
        for node in self.descendants(id) {
            if let NodeData::Text(text) = self.data(node) {
                raw.push_str(text);
            }
        }
        decode_entities(&raw)
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub(crate) fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Remove `id` from its parent. Its subtree stays intact but unreachable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&child| child != id);
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `new` immediately before `reference` among its siblings.
    ///
    /// Returns false (and does nothing) when `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) -> bool {
        self.insert_relative(reference, new, 0)
    }

    /// Insert `new` immediately after `reference` among its siblings.
    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) -> bool {
        self.insert_relative(reference, new, 1)
    }

    fn insert_relative(&mut self, reference: NodeId, new: NodeId, offset: usize) -> bool {
        let Some(parent) = self.nodes[reference.0].parent else {
            return false;
        };
        self.detach(new);
        let siblings = &mut self.nodes[parent.0].children;
        let Some(index) = siblings.iter().position(|&c| c == reference) else {
            return false;
        };
        siblings.insert(index + offset, new);
        self.nodes[new.0].parent = Some(parent);
        true
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        let text = self.create_text(text);
        self.append_child(id, text);
    }

    /// Deep-copy the top-level nodes of `fragment` into this arena.
    ///
    /// The copies are detached; the caller attaches them.
    pub fn import_children(&mut self, fragment: &Document) -> Vec<NodeId> {
        let mut roots = Vec::new();
        // (node in `fragment`, parent copy in `self`)
        let mut pending: Vec<(NodeId, Option<NodeId>)> = fragment
            .children(NodeId::ROOT)
            .iter()
            .rev()
            .map(|&child| (child, None))
            .collect();

        while let Some((source, parent)) = pending.pop() {
            let copy = self.push(fragment.data(source).clone());
            match parent {
                Some(parent) => self.append_child(parent, copy),
                None => roots.push(copy),
            }
            pending.extend(
                fragment
                    .children(source)
                    .iter()
                    .rev()
                    .map(|&child| (child, Some(copy))),
            );
        }
        roots
    }
}

/// Decode the entities that matter for emptiness checks and text comparison.
///
/// Unknown named entities are left as written.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').and_then(|end| {
            let name = &tail[1..end];
            decode_entity(name).map(|ch| (ch, end + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
