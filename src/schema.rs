//! Prop Schema Builder
//!
//! A component's props come from two places: the `key: type` lines of its
//! `props` block, and one synthesized `slot<Name>` prop of type `Node` per
//! `<slot name="...">` placeholder in its own markup. Declarations win when
//! both name the same key.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::is_identifier;
use crate::parse::TemplateNode;

/// Field name reserved for passthrough attributes on every props struct.
pub const ATTRS_FIELD: &str = "Attrs";
pub const SLOT_TYPE: &str = "Node";

lazy_static! {
    static ref SLICE_TYPE_RE: Regex = Regex::new(r"^\[\]\s*(.+)$").unwrap();
    static ref MAP_TYPE_RE: Regex = Regex::new(r"^map\[\s*([^\]]+?)\s*\]\s*(.+)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropOrigin {
    Declared,
    Slot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropField {
    /// Key as written.
    pub key: String,
    /// Canonical struct field name, `Capitalize(key)`.
    pub field: String,
    pub ty: String,
    pub origin: PropOrigin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropSchema {
    fields: BTreeMap<String, PropField>,
}

impl PropSchema {
    /// Case-insensitive key lookup.
    pub fn get(&self, key: &str) -> Option<&PropField> {
        self.fields.get(&key.to_lowercase())
    }

    pub fn field_name(&self, key: &str) -> Option<&str> {
        self.get(key).map(|f| f.field.as_str())
    }

    /// Fields sorted by field name, the order they are emitted in.
    pub fn sorted_fields(&self) -> Vec<&PropField> {
        let mut fields: Vec<&PropField> = self.fields.values().collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        fields
    }

    /// Lowercase key to field name, as shared with call sites.
    pub fn field_map(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(k, f)| (k.clone(), f.field.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub message: String,
    /// 1-based line within the props text, 0 when the error comes from markup.
    pub line: u32,
}

impl SchemaError {
    fn new(message: impl Into<String>, line: u32) -> Self {
        SchemaError {
            message: message.into(),
            line,
        }
    }
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn slot_key(name: &str) -> String {
    format!("slot{}", capitalize(name))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARED PROPS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropDecl {
    pub key: String,
    pub ty: String,
    pub line: u32,
}

/// Parse `key: type` lines. Blank lines and `#` comments are skipped; the
/// type may be quoted.
pub fn parse_props(text: &str) -> Result<Vec<PropDecl>, SchemaError> {
    let mut decls: Vec<PropDecl> = Vec::new();
    let mut seen = BTreeSet::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx as u32 + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((key, ty)) = trimmed.split_once(':') else {
            return Err(SchemaError::new(
                format!("expected `key: type`, found {:?}", trimmed),
                line,
            ));
        };
        let key = key.trim();
        let ty = unquote(ty.trim());

        if !is_identifier(key) {
            return Err(SchemaError::new(
                format!("prop name {:?} is not a valid identifier", key),
                line,
            ));
        }
        if ty.is_empty() {
            return Err(SchemaError::new(format!("prop {:?} has no type", key), line));
        }
        if key.eq_ignore_ascii_case(ATTRS_FIELD) {
            return Err(SchemaError::new(
                format!("prop name {:?} is reserved for passthrough attributes", key),
                line,
            ));
        }
        if !seen.insert(key.to_lowercase()) {
            return Err(SchemaError::new(
                format!("prop {:?} is declared more than once", key),
                line,
            ));
        }

        decls.push(PropDecl {
            key: key.to_string(),
            ty: target_type(ty),
            line,
        });
    }

    Ok(decls)
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return s[1..s.len() - 1].trim();
        }
    }
    s
}

/// Map the short type names templates use onto Rust types. Anything else is
/// taken as written.
pub fn target_type(ty: &str) -> String {
    let ty = ty.trim();
    if let Some(caps) = SLICE_TYPE_RE.captures(ty) {
        return format!("Vec<{}>", target_type(&caps[1]));
    }
    if let Some(caps) = MAP_TYPE_RE.captures(ty) {
        return format!(
            "std::collections::HashMap<{}, {}>",
            target_type(&caps[1]),
            target_type(&caps[2])
        );
    }
    match ty {
        "string" => "String".to_string(),
        "int" => "i64".to_string(),
        "uint" => "u64".to_string(),
        "float" | "float64" => "f64".to_string(),
        "float32" => "f32".to_string(),
        "node" => SLOT_TYPE.to_string(),
        other => other.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SLOT SCAN
// ═══════════════════════════════════════════════════════════════════════════════

/// Names of `<slot>` placeholders in `root`, in order of first appearance.
///
/// `<slot>` elements that are direct children of a component element
/// (`components` holds lowercase names) fill that component's slots and are
/// not placeholders, though their contents are still scanned.
pub fn scan_slots(
    root: &TemplateNode,
    components: &BTreeSet<String>,
) -> Result<Vec<String>, SchemaError> {
    let mut names = Vec::new();
    collect_slots(root, components, false, &mut names)?;
    Ok(names)
}

fn collect_slots(
    node: &TemplateNode,
    components: &BTreeSet<String>,
    is_fill: bool,
    names: &mut Vec<String>,
) -> Result<(), SchemaError> {
    let children = match node {
        TemplateNode::Document(doc) => &doc.children,
        TemplateNode::Element(el) => {
            if el.tag == "slot" {
                let name = el.attr("name").map(str::trim).unwrap_or("");
                if name.is_empty() {
                    return Err(SchemaError::new("<slot> requires a name attribute", 0));
                }
                if !is_identifier(name) {
                    return Err(SchemaError::new(
                        format!("slot name {:?} is not a valid identifier", name),
                        0,
                    ));
                }
                if !is_fill && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            &el.children
        }
        _ => return Ok(()),
    };

    let parent_is_component = node
        .as_element()
        .map(|el| components.contains(&el.tag))
        .unwrap_or(false);
    for child in children {
        collect_slots(child, components, parent_is_component, names)?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEMA
// ═══════════════════════════════════════════════════════════════════════════════

pub fn build_schema(
    props_text: Option<&str>,
    markup: &TemplateNode,
    components: &BTreeSet<String>,
) -> Result<PropSchema, SchemaError> {
    let mut schema = PropSchema::default();

    if let Some(text) = props_text {
        for decl in parse_props(text)? {
            schema.fields.insert(
                decl.key.to_lowercase(),
                PropField {
                    field: capitalize(&decl.key),
                    key: decl.key,
                    ty: decl.ty,
                    origin: PropOrigin::Declared,
                },
            );
        }
    }

    for slot in scan_slots(markup, components)? {
        let key = slot_key(&slot);
        schema
            .fields
            .entry(key.to_lowercase())
            .or_insert_with(|| PropField {
                field: capitalize(&key),
                key,
                ty: SLOT_TYPE.to_string(),
                origin: PropOrigin::Slot,
            });
    }

    Ok(schema)
}
