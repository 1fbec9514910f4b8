//! Retained SVG scene graph
//!
//! Nodes live in a slab and are addressed by `NodeId`. Removed slots are
//! never reused, so a stale id simply stops resolving.

use std::fmt::Write;

/// Handle to a node in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single element
#[derive(Debug, Clone)]
pub struct Node {
    pub tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    fn new(tag: &'static str, parent: Option<NodeId>) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
            parent,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

/// Element tree rooted at the mount container
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Scene {
    /// Create a scene with a `div` mount container carrying `mount_id`
    pub fn new(mount_id: &str) -> Self {
        let mut root = Node::new("div", None);
        root.attrs.push(("id", mount_id.to_string()));
        Self {
            nodes: vec![Some(root)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(|n| n.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(|n| n.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, the mount container included
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Append a new child element; a dead parent yields a detached no-op id
    pub fn append(&mut self, parent: NodeId, tag: &'static str) -> NodeId {
        self.insert(parent, tag, None)
    }

    /// Insert a new child before `before` (or at the end if `before` is not a child)
    pub fn insert_before(&mut self, parent: NodeId, tag: &'static str, before: NodeId) -> NodeId {
        self.insert(parent, tag, Some(before))
    }

    fn insert(&mut self, parent: NodeId, tag: &'static str, before: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let live_parent = self.contains(parent);
        self.nodes
            .push(Some(Node::new(tag, live_parent.then_some(parent))));

        if let Some(p) = self.get_mut(parent) {
            let pos = before
                .and_then(|b| p.children.iter().position(|c| *c == b))
                .unwrap_or(p.children.len());
            p.children.insert(pos, id);
        }
        id
    }

    /// Set (or replace) an attribute
    pub fn set_attr(&mut self, id: NodeId, name: &'static str, value: impl Into<String>) -> &mut Self {
        if let Some(node) = self.get_mut(id) {
            let value = value.into();
            match node.attrs.iter_mut().find(|(k, _)| *k == name) {
                Some(slot) => slot.1 = value,
                None => node.attrs.push((name, value)),
            }
        }
        self
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(node) = self.get_mut(id) {
            node.text = Some(text.into());
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| n.attr(name))
    }

    /// Remove a node and its whole subtree. Removing the root only clears its children.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            let children = self.get(id).map(|n| n.children.clone()).unwrap_or_default();
            for child in children {
                self.remove(child);
            }
            return;
        }

        let Some(node) = self.nodes.get_mut(id.0).and_then(|n| n.take()) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|p| self.get_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
        for child in node.children {
            self.remove(child);
        }
    }

    /// All live descendants of `from` (depth first, document order)
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                if id != from {
                    out.push(id);
                }
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Descendants of the root carrying `class`
    pub fn select_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|n| n.has_class(class)))
            .collect()
    }

    /// Serialize the subtree under `id` as markup
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Serialize the children of the mount container (what goes into its innerHTML)
    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.get(self.root) {
            for child in &root.children {
                self.write_node(*child, &mut out);
            }
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        let _ = write!(out, "<{}", node.tag);
        for (k, v) in &node.attrs {
            let _ = write!(out, " {}=\"{}\"", k, escape(v));
        }
        if node.children.is_empty() && node.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &node.text {
            out.push_str(&escape(text));
        }
        for child in &node.children {
            self.write_node(*child, out);
        }
        let _ = write!(out, "</{}>", node.tag);
    }
}

/// Escape text for XML attribute values and character data
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
