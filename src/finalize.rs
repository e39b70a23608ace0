//! Finalize Module for htmlc
//!
//! Source Assembler: turns compiled components into the files of the
//! generated module. Each component becomes a props struct, a
//! `<Name>Comp` constructor and a `get` convenience method. Output is either
//! one `mod.rs`, or a `mod.rs` plus one file per component that imports only
//! what its own text uses.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::config::{is_identifier, Config};
use crate::logger::Logger;
use crate::schema::{PropSchema, ATTRS_FIELD};

pub const MOD_FILE: &str = "mod.rs";
pub const GENERATED_BANNER: &str = "// Code generated by htmlc. DO NOT EDIT.";
const LINT_ALLOWANCES: &str = "#![allow(non_snake_case, unused_imports, unused_mut, unused_parens, unused_variables, clippy::all)]";

lazy_static! {
    static ref IMPORT_RE: Regex =
        Regex::new(r"^(?:pub\s+)?(?:use\s+)?((?:::)?[A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*(?:::(?:\*|\{(?s:.*)\}))?)(?:\s+as\s+([A-Za-z_][A-Za-z0-9_]*))?\s*;?$")
            .unwrap();
    static ref CAMEL_BOUNDARY_RE: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
    static ref ACRONYM_BOUNDARY_RE: Regex = Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap();
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub path: String,
    /// Explicit `as` alias.
    pub alias: Option<String>,
}

impl ImportSpec {
    /// `a::{b, c}` and `a::*` bring in several names.
    pub fn is_grouped(&self) -> bool {
        self.path.contains('{') || self.path.ends_with('*')
    }

    /// Name the import introduces, or `None` for grouped imports.
    pub fn binding(&self) -> Option<&str> {
        if let Some(alias) = &self.alias {
            return Some(alias);
        }
        if self.is_grouped() {
            return None;
        }
        self.path.rsplit("::").next()
    }

    pub fn to_source(&self) -> String {
        match &self.alias {
            Some(alias) => format!("use {} as {};", self.path, alias),
            None => format!("use {};", self.path),
        }
    }
}

/// Parse the body of an `imports` block. Entries are `use` statements or bare
/// paths, separated by `;` or newlines; `//` comments are skipped.
pub fn parse_imports(text: &str) -> Result<Vec<ImportSpec>, String> {
    let cleaned: String = text
        .lines()
        .map(|l| match l.find("//") {
            Some(i) => &l[..i],
            None => l,
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut imports = Vec::new();
    for entry in split_entries(&cleaned) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let caps = IMPORT_RE
            .captures(entry)
            .ok_or_else(|| format!("invalid import {:?}", entry))?;
        let path: String = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
        imports.push(ImportSpec {
            path: path.trim().to_string(),
            alias: caps.get(2).map(|m| m.as_str().to_string()),
        });
    }
    Ok(imports)
}

/// Split on `;` and newlines outside `{...}` groups.
fn split_entries(text: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ';' | '\n' if depth == 0 => {
                entries.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&text[start..]);
    entries
}

/// Collapse imports of the same path, preferring an explicitly aliased form,
/// and sort by path.
pub fn deduplicate_imports(imports: &[ImportSpec]) -> Vec<ImportSpec> {
    let mut by_path: BTreeMap<&str, &ImportSpec> = BTreeMap::new();
    for import in imports {
        match by_path.get(import.path.as_str()) {
            Some(existing) if existing.alias.is_some() || import.alias.is_none() => {}
            _ => {
                by_path.insert(&import.path, import);
            }
        }
    }
    by_path.into_values().cloned().collect()
}

/// Imports a piece of generated code refers to. Grouped imports are always
/// kept since their names are unknown.
pub fn imports_used_in(text: &str, imports: &[ImportSpec]) -> Vec<ImportSpec> {
    imports
        .iter()
        .filter(|import| match import.binding() {
            None => true,
            Some(name) => Regex::new(&format!(r"\b{}\b", regex::escape(name)))
                .map(|re| re.is_match(text))
                .unwrap_or(true),
        })
        .cloned()
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// UNITS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub name: String,
    /// File stem in per-component mode.
    pub file_stem: String,
    pub props_struct: String,
    /// `get` method and constructor.
    pub body: String,
    pub used_imports: Vec<ImportSpec>,
}

impl GeneratedUnit {
    pub fn source(&self) -> String {
        format!("{}\n{}", self.props_struct, self.body)
    }
}

/// Build the source of one component around its compiled expression.
pub fn build_unit(name: &str, schema: &PropSchema, expr_text: &str) -> GeneratedUnit {
    let mut props_struct = format!("#[derive(Default)]\npub struct {} {{\n", name);
    for field in schema.sorted_fields() {
        props_struct.push_str(&format!("    pub {}: {},\n", field.field, field.ty));
    }
    props_struct.push_str(&format!("    pub {}: Attrs,\n}}\n", ATTRS_FIELD));

    let body = format!(
        "impl {name} {{\n    pub fn get(mut self, children: Vec<Node>) -> Node {{\n        \
         let attrs = std::mem::take(&mut self.{attrs});\n        {name}Comp(self, attrs, children)\n    }}\n}}\n\n\
         pub fn {name}Comp(mut props: {name}, attrs: Attrs, children: Vec<Node>) -> Node {{\n    \
         props.{attrs} = attrs;\n    let attrs = &props.{attrs};\n    {expr}\n}}\n",
        name = name,
        attrs = ATTRS_FIELD,
        expr = expr_text
    );

    GeneratedUnit {
        name: name.to_string(),
        file_stem: component_file_name(name),
        props_struct,
        body,
        used_imports: Vec::new(),
    }
}

/// `MyCard` → `my_card`; `HTMLPage` → `html_page`; keywords get a suffix.
pub fn component_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c),
            _ => None,
        })
        .collect();
    let snake = ACRONYM_BOUNDARY_RE.replace_all(&cleaned, "${1}_${2}");
    let snake = CAMEL_BOUNDARY_RE.replace_all(&snake, "${1}_${2}").to_lowercase();
    let snake = snake.trim_matches('_').to_string();

    if snake.is_empty() {
        return "component".to_string();
    }
    if RUST_KEYWORDS.contains(&snake.as_str()) || !is_identifier(&snake) {
        return format!("{}_component", snake.trim_start_matches(|c: char| c.is_ascii_digit()))
            .trim_start_matches('_')
            .to_string();
    }
    snake
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSEMBLY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// File name inside the package directory.
    pub name: String,
    pub contents: String,
    /// Component defined in this file, for per-component files.
    pub component: Option<String>,
}

fn header(config: &Config, body_imports: &str) -> String {
    let mut out = format!(
        "{}\n\n{}\n\nuse {} as rt;\nuse {}::{{Attrs, Node}};\n",
        GENERATED_BANNER, LINT_ALLOWANCES, config.runtime_path, config.runtime_path
    );
    out.push_str(body_imports);
    out
}

fn import_lines(imports: &[ImportSpec]) -> String {
    imports
        .iter()
        .map(|i| format!("{}\n", i.to_source()))
        .collect()
}

/// Assemble the files of the generated module. `units` must be sorted by name.
pub fn assemble(
    units: &mut [GeneratedUnit],
    imports: &[ImportSpec],
    config: &Config,
    logger: &dyn Logger,
) -> Vec<OutputFile> {
    let imports = deduplicate_imports(imports);
    let mut files = Vec::new();

    if config.single_file() {
        let mut contents = header(config, &import_lines(&imports));
        for unit in units.iter_mut() {
            unit.used_imports = imports_used_in(&unit.source(), &imports);
            contents.push('\n');
            contents.push_str(&unit.source());
        }
        files.push(OutputFile {
            name: MOD_FILE.to_string(),
            contents,
            component: None,
        });
    } else {
        assign_unique_stems(units);

        let mut mod_rs = header(config, "");
        mod_rs.push('\n');
        for unit in units.iter() {
            mod_rs.push_str(&format!("mod {};\npub use {}::*;\n", unit.file_stem, unit.file_stem));
        }
        files.push(OutputFile {
            name: MOD_FILE.to_string(),
            contents: mod_rs,
            component: None,
        });

        for unit in units.iter_mut() {
            let source = unit.source();
            unit.used_imports = imports_used_in(&source, &imports);
            let contents = format!(
                "{}\n\n{}\n\nuse super::*;\n{}\n{}",
                GENERATED_BANNER,
                LINT_ALLOWANCES,
                import_lines(&unit.used_imports),
                source
            );
            files.push(OutputFile {
                name: format!("{}.rs", unit.file_stem),
                contents,
                component: Some(unit.name.clone()),
            });
        }
    }

    if config.format {
        for file in &mut files {
            match format_source(&file.contents) {
                Ok(formatted) => file.contents = formatted,
                Err(e) => logger.warn(&format!(
                    "rustfmt failed on {}, keeping unformatted output: {}",
                    file.name, e
                )),
            }
        }
    }

    files
}

/// Names that collide after snake-casing get a numeric suffix.
fn assign_unique_stems(units: &mut [GeneratedUnit]) {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for unit in units.iter_mut() {
        let count = seen.entry(unit.file_stem.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            unit.file_stem = format!("{}_{}", unit.file_stem, count);
        }
    }
}

/// Run `rustfmt` over `source`.
pub fn format_source(source: &str) -> Result<String, String> {
    let mut child = Command::new("rustfmt")
        .args(["--edition", "2021"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("could not run rustfmt: {}", e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(source.as_bytes())
            .map_err(|e| format!("could not write to rustfmt: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("rustfmt did not finish: {}", e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(stderr.lines().next().unwrap_or("unknown error").to_string());
    }
    String::from_utf8(output.stdout).map_err(|e| format!("rustfmt produced invalid UTF-8: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputMode;
    use crate::logger::NoopLogger;
    use crate::parse::parse_template;
    use crate::schema::build_schema;
    use std::collections::BTreeSet;

    fn import(path: &str, alias: Option<&str>) -> ImportSpec {
        ImportSpec {
            path: path.to_string(),
            alias: alias.map(str::to_string),
        }
    }

    fn unit(name: &str, props: &str, expr: &str) -> GeneratedUnit {
        let schema = build_schema(Some(props), &parse_template("").unwrap(), &BTreeSet::new()).unwrap();
        build_unit(name, &schema, expr)
    }

    fn config(mode: OutputMode) -> Config {
        Config {
            mode,
            format: false,
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_imports_forms() {
        let imports = parse_imports(
            "use crate::models::User;\nchrono::NaiveDate as Date\n// note\nuse std::fmt::{self, Write};\n",
        )
        .unwrap();
        assert_eq!(
            imports,
            vec![
                import("crate::models::User", None),
                import("chrono::NaiveDate", Some("Date")),
                import("std::fmt::{self, Write}", None),
            ]
        );

        let imports = parse_imports("crate::a::B\ncrate::c::D as E").unwrap();
        assert_eq!(imports, vec![import("crate::a::B", None), import("crate::c::D", Some("E"))]);

        let imports = parse_imports("use crate::ui::{\n    Icon,\n    Theme,\n};").unwrap();
        assert_eq!(imports, vec![import("crate::ui::{ Icon, Theme, }", None)]);

        assert!(parse_imports("use 1bad;").is_err());
    }

    #[test]
    fn test_bindings() {
        assert_eq!(import("crate::models::User", None).binding(), Some("User"));
        assert_eq!(import("chrono::NaiveDate", Some("Date")).binding(), Some("Date"));
        assert_eq!(import("std::fmt::{self, Write}", None).binding(), None);
        assert_eq!(import("crate::prelude::*", None).binding(), None);
    }

    #[test]
    fn test_deduplicate_prefers_alias_and_sorts() {
        let deduped = deduplicate_imports(&[
            import("z::Zed", None),
            import("a::Thing", None),
            import("a::Thing", Some("T")),
            import("a::Thing", None),
        ]);
        assert_eq!(deduped, vec![import("a::Thing", Some("T")), import("z::Zed", None)]);
    }

    #[test]
    fn test_imports_used_in_matches_whole_words() {
        let imports = vec![
            import("crate::models::User", None),
            import("crate::models::UserList", None),
            import("std::fmt::{self, Write}", None),
        ];
        let used = imports_used_in("pub Owner: User,", &imports);
        assert_eq!(used, vec![imports[0].clone(), imports[2].clone()]);
    }

    #[test]
    fn test_component_file_name() {
        assert_eq!(component_file_name("Card"), "card");
        assert_eq!(component_file_name("MyCard"), "my_card");
        assert_eq!(component_file_name("HTMLPage"), "html_page");
        assert_eq!(component_file_name("nav-bar item"), "nav_bar_item");
        assert_eq!(component_file_name("Type"), "type_component");
        assert_eq!(component_file_name("!!"), "component");
    }

    #[test]
    fn test_unit_shape() {
        let u = unit("Card", "title: string\ncount: int", "rt::Node::Empty");
        assert_eq!(
            u.props_struct,
            "#[derive(Default)]\npub struct Card {\n    pub Count: i64,\n    pub Title: String,\n    pub Attrs: Attrs,\n}\n"
        );
        assert!(u.body.contains("pub fn CardComp(mut props: Card, attrs: Attrs, children: Vec<Node>) -> Node {"));
        assert!(u.body.contains("props.Attrs = attrs;\n    let attrs = &props.Attrs;\n    rt::Node::Empty\n}"));
        assert!(u.body.contains("let attrs = std::mem::take(&mut self.Attrs);"));
    }

    #[test]
    fn test_single_file_mode() {
        let mut units = vec![unit("A", "", "rt::Node::Empty"), unit("B", "", "rt::Node::Empty")];
        let files = assemble(
            &mut units,
            &[import("crate::x::Y", None), import("crate::x::Y", Some("Z"))],
            &config(OutputMode::SingleFile),
            &NoopLogger,
        );
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "mod.rs");
        let text = &files[0].contents;
        assert!(text.starts_with(GENERATED_BANNER));
        assert!(text.contains("use htmlc::runtime as rt;\nuse htmlc::runtime::{Attrs, Node};\nuse crate::x::Y as Z;\n"));
        assert!(text.find("pub struct A").unwrap() < text.find("pub struct B").unwrap());
    }

    #[test]
    fn test_per_component_mode_filters_imports() {
        let mut units = vec![unit("Card", "owner: User", "rt::Node::Empty"), unit("MyPage", "", "rt::Node::Empty")];
        let files = assemble(
            &mut units,
            &[import("crate::models::User", None), import("crate::models::Team", None)],
            &config(OutputMode::PerComponent),
            &NoopLogger,
        );
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["mod.rs", "card.rs", "my_page.rs"]);

        assert!(files[0].contents.contains("mod card;\npub use card::*;\nmod my_page;\npub use my_page::*;\n"));
        assert!(!files[0].contents.contains("crate::models"));

        assert!(files[1].contents.contains("use super::*;\nuse crate::models::User;\n"));
        assert!(!files[1].contents.contains("Team"));
        assert!(!files[2].contents.contains("crate::models"));
        assert_eq!(files[1].component.as_deref(), Some("Card"));
        assert_eq!(units[0].used_imports, vec![import("crate::models::User", None)]);
    }

    #[test]
    fn test_colliding_stems_are_suffixed() {
        let mut units = vec![unit("CardItem", "", "rt::Node::Empty"), unit("Card_Item", "", "rt::Node::Empty")];
        let files = assemble(&mut units, &[], &config(OutputMode::PerComponent), &NoopLogger);
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["mod.rs", "card_item.rs", "card_item_2.rs"]);
    }
}
