//! Rendering runtime used by generated components.
//!
//! Generated code imports this module as `rt` and builds a [`Node`] tree with
//! the free functions below. Every value that reaches a template goes through
//! [`ToNode`], so the handful of permitted shapes (text, nodes, sequences,
//! primitives, options) are resolved by the type checker instead of at render
//! time. The only runtime dispatch left is [`Lookup`] for `$name.key`
//! expressions.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;

// ═══════════════════════════════════════════════════════════════════════════════
// NODE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Node {
    #[default]
    Empty,
    /// Escaped when rendered.
    Text(String),
    /// Written as-is. Literal template text is escaped when it is compiled.
    Raw(String),
    Element(Element),
    Fragment(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Attrs,
    pub children: Vec<Node>,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

impl Node {
    /// Write the node as HTML, returning the number of bytes written.
    pub fn render(&self, w: &mut dyn io::Write) -> io::Result<usize> {
        let mut out = String::new();
        self.write_html(&mut out);
        w.write_all(out.as_bytes())?;
        Ok(out.len())
    }

    pub fn render_to_string(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Node::Empty => true,
            Node::Text(s) | Node::Raw(s) => s.is_empty(),
            Node::Fragment(nodes) => nodes.iter().all(Node::is_empty),
            Node::Element(_) => false,
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Empty => {}
            Node::Text(text) => escape_into(text, out),
            Node::Raw(html) => out.push_str(html),
            Node::Fragment(nodes) => {
                for node in nodes {
                    node.write_html(out);
                }
            }
            Node::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in el.attrs.iter() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    value.write_attr_value(out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag.as_str()) && el.children.is_empty() {
                    return;
                }
                for child in &el.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }

    fn write_attr_value(&self, out: &mut String) {
        match self {
            Node::Raw(html) => out.push_str(html),
            Node::Fragment(nodes) => {
                for node in nodes {
                    node.write_attr_value(out);
                }
            }
            other => {
                let mut html = String::new();
                other.write_html(&mut html);
                match other {
                    Node::Text(_) => out.push_str(&html),
                    // Markup inside an attribute has to be quoted as text.
                    _ => escape_into(&html, out),
                }
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_to_string())
    }
}

impl From<Node> for String {
    fn from(node: Node) -> String {
        node.render_to_string()
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Node {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Node {
        Node::Text(text)
    }
}

impl From<Vec<Node>> for Node {
    fn from(nodes: Vec<Node>) -> Node {
        Node::Fragment(nodes)
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, &mut out);
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

/// Attribute list in source order. Setting an existing name replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attrs {
    entries: Vec<(String, Node)>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<Node>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, Node)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (&'a str, Node)>>(iter: I) -> Self {
        let mut attrs = Attrs::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUE CONVERSION
// ═══════════════════════════════════════════════════════════════════════════════

/// A value that can be placed in a template.
pub trait ToNode {
    fn to_node(&self) -> Node;
}

impl ToNode for Node {
    fn to_node(&self) -> Node {
        self.clone()
    }
}

impl ToNode for str {
    fn to_node(&self) -> Node {
        Node::Text(self.to_string())
    }
}

impl ToNode for String {
    fn to_node(&self) -> Node {
        Node::Text(self.clone())
    }
}

impl<T: ToNode + ?Sized> ToNode for &T {
    fn to_node(&self) -> Node {
        (**self).to_node()
    }
}

impl<T: ToNode + ?Sized> ToNode for Box<T> {
    fn to_node(&self) -> Node {
        (**self).to_node()
    }
}

impl<T: ToNode> ToNode for Option<T> {
    fn to_node(&self) -> Node {
        match self {
            Some(value) => value.to_node(),
            None => Node::Empty,
        }
    }
}

impl<T: ToNode> ToNode for [T] {
    fn to_node(&self) -> Node {
        Node::Fragment(self.iter().map(ToNode::to_node).collect())
    }
}

impl<T: ToNode> ToNode for Vec<T> {
    fn to_node(&self) -> Node {
        self.as_slice().to_node()
    }
}

macro_rules! display_to_node {
    ($($ty:ty),*) => {
        $(
            impl ToNode for $ty {
                fn to_node(&self) -> Node {
                    Node::Text(self.to_string())
                }
            }
        )*
    };
}

display_to_node!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

// ═══════════════════════════════════════════════════════════════════════════════
// KEYED LOOKUP
// ═══════════════════════════════════════════════════════════════════════════════

/// Dynamic `source.key` access for `{$source.key}` expressions. Missing keys
/// render as nothing.
pub trait Lookup {
    fn lookup(&self, key: &str) -> Node;
}

impl<T: Lookup + ?Sized> Lookup for &T {
    fn lookup(&self, key: &str) -> Node {
        (**self).lookup(key)
    }
}

impl Lookup for Attrs {
    fn lookup(&self, key: &str) -> Node {
        self.get(key).cloned().unwrap_or_default()
    }
}

impl<V: ToNode> Lookup for HashMap<String, V> {
    fn lookup(&self, key: &str) -> Node {
        self.get(key).map(ToNode::to_node).unwrap_or_default()
    }
}

impl<V: ToNode> Lookup for BTreeMap<String, V> {
    fn lookup(&self, key: &str) -> Node {
        self.get(key).map(ToNode::to_node).unwrap_or_default()
    }
}

impl Lookup for serde_json::Map<String, serde_json::Value> {
    fn lookup(&self, key: &str) -> Node {
        self.get(key).map(ToNode::to_node).unwrap_or_default()
    }
}

impl ToNode for serde_json::Value {
    fn to_node(&self) -> Node {
        match self {
            serde_json::Value::Null => Node::Empty,
            serde_json::Value::String(s) => Node::Text(s.clone()),
            serde_json::Value::Array(items) => items.to_node(),
            other => Node::Text(other.to_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn element(tag: &str, attrs: Attrs, children: Vec<Node>) -> Node {
    Node::Element(Element {
        tag: tag.to_string(),
        attrs,
        children,
    })
}

pub fn attrs(entries: Vec<(&str, Node)>) -> Attrs {
    entries.into_iter().collect()
}

pub fn fragment(nodes: Vec<Node>) -> Node {
    Node::Fragment(nodes)
}

pub fn node<T: ToNode + ?Sized>(value: &T) -> Node {
    value.to_node()
}

pub fn raw(html: &str) -> Node {
    Node::Raw(html.to_string())
}

pub fn lookup<L: Lookup + ?Sized>(source: &L, key: &str) -> Node {
    source.lookup(key)
}
