//! Component definitions and the cross-component lookup table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::schema::PropSchema;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

/// One `define "Name"` block and the sub-blocks found inside it.
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    pub name: String,
    pub path: PathBuf,
    /// Content of the owning file, shared by every component it defines.
    pub file_content: Rc<str>,
    pub props_text: Option<String>,
    pub markup: Option<String>,
    /// 1-based line of the `define` marker.
    pub line: u32,
    /// 1-based line of the `props` marker, when present.
    pub props_line: Option<u32>,
}

impl ComponentDefinition {
    pub fn path_display(&self) -> String {
        self.path.display().to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMP INFO
// ═══════════════════════════════════════════════════════════════════════════════

/// What a call site needs to know about a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompInfo {
    pub name: String,
    /// Lowercase prop key to struct field name.
    pub props: BTreeMap<String, String>,
}

impl CompInfo {
    pub fn new(name: &str, schema: &PropSchema) -> Self {
        CompInfo {
            name: name.to_string(),
            props: schema.field_map(),
        }
    }

    pub fn field_for(&self, key: &str) -> Option<&str> {
        self.props.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn constructor(&self) -> String {
        format!("{}Comp", self.name)
    }
}

/// Every component, keyed by lowercase name. Built once before compilation
/// starts and only read afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentTable {
    entries: BTreeMap<String, CompInfo>,
}

impl ComponentTable {
    pub fn build<'a, I>(components: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a PropSchema)>,
    {
        let entries = components
            .into_iter()
            .map(|(name, schema)| (name.to_lowercase(), CompInfo::new(name, schema)))
            .collect();
        ComponentTable { entries }
    }

    /// Look up a component by tag name, ignoring case.
    pub fn get(&self, tag: &str) -> Option<&CompInfo> {
        self.entries.get(&tag.to_lowercase())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
