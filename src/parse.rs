//! Parse Module for htmlc
//!
//! Turns the markup of a component's `html` block into a [`TemplateNode`]
//! tree using html5ever. Two pre-passes run before the HTML parser sees the
//! text:
//!
//! 1. every single-level `{expr}` span is swapped for a placeholder, so
//!    expressions containing `<`, `>` or quotes survive tokenization, and the
//!    original text is restored verbatim afterwards;
//! 2. self-closing non-void tags (`<slot name="x"/>`, `<Card/>`) are expanded
//!    to open/close pairs, since HTML5 ignores the `/` on unknown elements.
//!
//! Markup containing `<html` is parsed as a full document, anything else as a
//! fragment in a `div` context.

use html5ever::{parse_document, parse_fragment, LocalName, Namespace, ParseOpts, QualName};
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tendril::TendrilSink;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

lazy_static! {
    /// Single-level `{expr}` span, no nested braces.
    pub(crate) static ref BRACED_EXPR_RE: Regex = Regex::new(r"\{([^{}]*)\}").unwrap();

    static ref EXPR_PLACEHOLDER_RE: Regex = Regex::new(r"__HTMLC_EXPR_(\d+)__").unwrap();

    static ref SELF_CLOSING_RE: Regex =
        Regex::new(r"<([A-Za-z][A-Za-z0-9:._-]*)(\s[^<>]*?)?\s*/>").unwrap();

    /// `<script>`/`<style>` elements, whose bodies are raw text.
    static ref RAW_TEXT_ELEMENT_RE: Regex =
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap();

    /// Elements that never have children or a closing tag.
    pub static ref VOID_TAGS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect();

    /// Tags the HTML tree builder rewrites, relocates, drops or reads as raw
    /// text. An element by one of these names never reaches the compiler
    /// intact, so no component may take the name.
    static ref PARSER_SPECIAL_TAGS: HashSet<&'static str> = [
        "html", "head", "body", "frame", "frameset", "noframes", "image", "isindex",
        "plaintext", "xmp", "textarea", "title", "iframe", "noembed", "script", "style",
        "table", "caption", "colgroup", "col", "tbody", "thead", "tfoot", "tr", "td", "th",
        "select", "option", "optgroup", "math", "svg", "keygen",
    ]
    .into_iter()
    .collect();

    /// HTML and SVG element names the compiler treats as standard tags.
    static ref STANDARD_TAGS: HashSet<&'static str> = [
        // document
        "html", "head", "body", "title", "base", "link", "meta", "style", "script", "noscript",
        "template",
        // sections
        "article", "aside", "footer", "header", "main", "nav", "section", "address", "hgroup",
        "h1", "h2", "h3", "h4", "h5", "h6",
        // grouping
        "div", "p", "hr", "pre", "blockquote", "ol", "ul", "li", "dl", "dt", "dd", "figure",
        "figcaption", "menu", "search",
        // text-level
        "a", "em", "strong", "small", "s", "cite", "q", "dfn", "abbr", "ruby", "rt", "rp",
        "data", "time", "code", "var", "samp", "kbd", "sub", "sup", "i", "b", "u", "mark",
        "bdi", "bdo", "span", "br", "wbr", "ins", "del",
        // embedded
        "picture", "source", "img", "iframe", "embed", "object", "param", "video", "audio",
        "track", "map", "area", "canvas",
        // tables
        "table", "caption", "colgroup", "col", "tbody", "thead", "tfoot", "tr", "td", "th",
        // forms
        "form", "label", "input", "button", "select", "datalist", "optgroup", "option",
        "textarea", "output", "progress", "meter", "fieldset", "legend",
        // interactive
        "details", "summary", "dialog",
        // svg
        "svg", "path", "circle", "ellipse", "line", "polyline", "polygon", "rect", "g", "defs",
        "use", "symbol", "clippath", "mask", "pattern", "marker", "lineargradient",
        "radialgradient", "stop", "filter", "foreignobject", "image", "text", "tspan",
        "textpath", "desc", "view", "animate", "animatemotion", "animatetransform",
    ]
    .into_iter()
    .collect();
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplateNode {
    Document(DocumentNode),
    Element(ElementNode),
    Text(TextNode),
    Doctype(DoctypeNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub children: Vec<TemplateNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    /// Lowercased by the HTML parser.
    pub tag: String,
    pub attributes: Vec<AttributeIR>,
    pub children: Vec<TemplateNode>,
}

impl ElementNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeIR {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctypeNode {
    pub name: String,
}

impl TemplateNode {
    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            TemplateNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, tag: &str) -> bool {
        self.as_element().map(|el| el.tag == tag).unwrap_or(false)
    }

    /// Text node made only of whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, TemplateNode::Text(t) if t.value.trim().is_empty())
    }
}

/// The HTML parser rejected the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub fn is_standard_tag(tag: &str) -> bool {
    STANDARD_TAGS.contains(tag.to_ascii_lowercase().as_str())
}

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag.to_ascii_lowercase().as_str())
}

/// Void tags and tags with their own tree-building rules.
pub fn is_parser_special_tag(tag: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    PARSER_SPECIAL_TAGS.contains(tag.as_str()) || VOID_TAGS.contains(tag.as_str())
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRE-PASSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Replace each `{expr}` span with an indexed placeholder.
fn normalize_expressions(html: &str) -> (String, Vec<String>) {
    let mut spans = Vec::new();
    let normalized = BRACED_EXPR_RE.replace_all(html, |caps: &regex::Captures| {
        spans.push(caps[0].to_string());
        format!("__HTMLC_EXPR_{}__", spans.len() - 1)
    });
    (normalized.into_owned(), spans)
}

/// Put the original `{expr}` text back in place of placeholders.
fn restore_expressions(text: &str, spans: &[String]) -> String {
    if !text.contains("__HTMLC_EXPR_") {
        return text.to_string();
    }
    EXPR_PLACEHOLDER_RE
        .replace_all(text, |caps: &regex::Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| spans.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// `<slot name="x"/>` → `<slot name="x"></slot>`; void tags and the bodies of
/// `<script>`/`<style>` are left alone.
fn expand_self_closing(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for raw in RAW_TEXT_ELEMENT_RE.find_iter(html) {
        out.push_str(&expand_tags(&html[last..raw.start()]));
        out.push_str(raw.as_str());
        last = raw.end();
    }
    out.push_str(&expand_tags(&html[last..]));
    out
}

fn expand_tags(html: &str) -> String {
    SELF_CLOSING_RE
        .replace_all(html, |caps: &regex::Captures| {
            let tag = &caps[1];
            if is_void_tag(tag) {
                return caps[0].to_string();
            }
            let attrs = caps.get(2).map(|m| m.as_str().trim_end()).unwrap_or("");
            format!("<{}{}></{}>", tag, attrs, tag)
        })
        .into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE CONVERSION
// ═══════════════════════════════════════════════════════════════════════════════

fn convert_children(handle: &Handle, spans: &[String]) -> Vec<TemplateNode> {
    handle
        .children
        .borrow()
        .iter()
        .filter_map(|child| convert_node(child, spans))
        .collect()
}

fn convert_node(handle: &Handle, spans: &[String]) -> Option<TemplateNode> {
    match &handle.data {
        NodeData::Document => Some(TemplateNode::Document(DocumentNode {
            children: convert_children(handle, spans),
        })),

        NodeData::Doctype { name, .. } => Some(TemplateNode::Doctype(DoctypeNode {
            name: name.to_string(),
        })),

        NodeData::Text { contents } => Some(TemplateNode::Text(TextNode {
            value: restore_expressions(&contents.borrow(), spans),
        })),

        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let attributes = attrs
                .borrow()
                .iter()
                .map(|attr| AttributeIR {
                    name: attr.name.local.to_string(),
                    value: restore_expressions(&attr.value, spans),
                })
                .collect();

            // <template> keeps its children in a separate fragment.
            let children = match template_contents.borrow().as_ref() {
                Some(contents) => convert_children(contents, spans),
                None => convert_children(handle, spans),
            };

            Some(TemplateNode::Element(ElementNode {
                tag: name.local.to_string(),
                attributes,
                children,
            }))
        }

        NodeData::Comment { .. } => None,
        NodeData::ProcessingInstruction { .. } => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN PARSING FUNCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse component markup into a `Document` node whose children are the
/// top-level nodes of the markup.
pub fn parse_template(html: &str) -> Result<TemplateNode, ParseError> {
    let trimmed = html.trim();
    let (normalized, spans) = normalize_expressions(trimmed);
    let expanded = expand_self_closing(&normalized);

    let is_document = trimmed.to_ascii_lowercase().contains("<html");

    let dom: RcDom = if is_document {
        parse_document(RcDom::default(), ParseOpts::default())
            .from_utf8()
            .read_from(&mut expanded.as_bytes())
    } else {
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("div"),
        );
        parse_fragment(RcDom::default(), ParseOpts::default(), context, vec![])
            .from_utf8()
            .read_from(&mut expanded.as_bytes())
    }
    .map_err(|e| ParseError::new(format!("Failed to parse HTML: {}", e)))?;

    let children = if is_document {
        convert_children(&dom.document, &spans)
    } else {
        // Fragment parsing hangs the nodes off a synthetic <html> root.
        let roots = dom.document.children.borrow();
        match roots.first() {
            Some(root) => convert_children(root, &spans),
            None => Vec::new(),
        }
    };

    Ok(TemplateNode::Document(DocumentNode { children }))
}
