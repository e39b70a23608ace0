//! Discovery Module for htmlc
//!
//! Finds component source files under the source root and splits each one
//! into its `imports` block and its component definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use walkdir::WalkDir;

use crate::component::{ComponentDefinition, SourceFile};
use crate::config::{is_identifier, Config};
use crate::error::{snippet_at_line, CompileError, ErrorKind, Result};
use crate::logger::Logger;
use crate::parse::is_parser_special_tag;
use crate::section::{sectionize, SectionError};
use crate::transform::CONTROL_TAGS;

pub const IMPORTS_BLOCK: &str = "imports";
pub const PROPS_BLOCK: &str = "props";
pub const HTML_BLOCK: &str = "html";

// ═══════════════════════════════════════════════════════════════════════════════
// FILE DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// Every source file under `config.src`, sorted by path.
pub fn find_source_files(config: &Config) -> Result<Vec<PathBuf>> {
    if !config.src.is_dir() {
        return Err(CompileError::io(
            config.src.display().to_string(),
            "source directory does not exist",
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&config.src).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            CompileError::io(
                e.path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| config.src.display().to_string()),
                format!("Failed to scan source directory: {}", e),
            )
        })?;
        let path = entry.path();
        if path.is_file() && config.has_source_extension(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

pub fn read_source(path: &Path) -> Result<SourceFile> {
    let content = fs::read_to_string(path).map_err(|e| {
        CompileError::io(path.display().to_string(), format!("Failed to read file: {}", e))
    })?;
    Ok(SourceFile {
        path: path.to_path_buf(),
        content,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECTIONING
// ═══════════════════════════════════════════════════════════════════════════════

/// What one source file contributes.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFile {
    pub imports: Option<String>,
    pub components: Vec<ComponentDefinition>,
}

fn section_error(file: &SourceFile, err: SectionError) -> CompileError {
    let mut out = CompileError::new(ErrorKind::Section, err.message)
        .with_file(file.path.display().to_string())
        .with_line(err.line);
    if let Some(snippet) = snippet_at_line(&file.content, err.line, 2) {
        out = out.with_snippet(snippet);
    }
    out
}

/// Split a file into its imports block and component definitions.
pub fn extract_components(file: &SourceFile, config: &Config, logger: &dyn Logger) -> Result<ExtractedFile> {
    let delims = &config.delimiters;
    let path = file.path.display().to_string();

    let file_blocks =
        sectionize(&delims.file, &file.content).map_err(|e| section_error(file, e))?;
    for block in file_blocks.iter().filter(|b| b.name != IMPORTS_BLOCK) {
        logger.debug(&format!("{}: ignoring file-level block {:?}", path, block.name));
    }

    let component_blocks =
        sectionize(&delims.component, &file.content).map_err(|e| section_error(file, e))?;

    let shared: Rc<str> = Rc::from(file.content.as_str());
    let mut components = Vec::with_capacity(component_blocks.len());

    for block in component_blocks.iter() {
        if !is_identifier(&block.name) {
            return Err(CompileError::new(
                ErrorKind::Schema,
                format!("component name {:?} is not a valid identifier", block.name),
            )
            .with_component(block.name.clone())
            .with_file(path.clone())
            .with_line(block.line));
        }
        if let Some(reason) = reserved_name(&block.name) {
            return Err(CompileError::new(
                ErrorKind::Schema,
                format!(
                    "component name {:?} collides with the <{}> tag, which {}",
                    block.name,
                    block.name.to_ascii_lowercase(),
                    reason
                ),
            )
            .with_component(block.name.clone())
            .with_file(path.clone())
            .with_line(block.line));
        }

        // Sub-block lines are relative to the body, which starts on the
        // define line.
        let sub = sectionize(&delims.block, &block.body).map_err(|e| {
            section_error(
                file,
                SectionError {
                    message: e.message,
                    line: block.line + e.line.saturating_sub(1),
                },
            )
        })?;

        for extra in sub.iter().filter(|s| s.name != PROPS_BLOCK && s.name != HTML_BLOCK) {
            logger.warn(&format!(
                "{}: component {} has unknown block {:?}; ignoring it",
                path, block.name, extra.name
            ));
        }
        if sub.get(HTML_BLOCK).is_none() {
            logger.warn(&format!(
                "{}: component {} has no html block; it renders nothing",
                path, block.name
            ));
        }

        components.push(ComponentDefinition {
            name: block.name.clone(),
            path: file.path.clone(),
            file_content: Rc::clone(&shared),
            props_text: sub.body(PROPS_BLOCK).map(str::to_string),
            markup: sub.body(HTML_BLOCK).map(str::to_string),
            line: block.line,
            props_line: sub.get(PROPS_BLOCK).map(|s| block.line + s.line - 1),
        });
    }

    Ok(ExtractedFile {
        imports: file_blocks.body(IMPORTS_BLOCK).map(str::to_string),
        components,
    })
}

/// Why `name` cannot be used for a component, if it cannot.
fn reserved_name(name: &str) -> Option<&'static str> {
    let tag = name.to_ascii_lowercase();
    if CONTROL_TAGS.contains(&tag.as_str()) {
        Some("is a template control tag")
    } else if is_parser_special_tag(&tag) {
        Some("the HTML parser does not keep as written")
    } else {
        None
    }
}

/// Component names must be unique across all files, ignoring case.
pub fn check_duplicates(components: &[ComponentDefinition]) -> Result<()> {
    let mut seen: BTreeMap<String, &ComponentDefinition> = BTreeMap::new();
    for def in components {
        if let Some(first) = seen.get(&def.name.to_lowercase()) {
            let message = if first.name == def.name {
                format!(
                    "component {:?} is defined in both {} and {}",
                    def.name,
                    first.path_display(),
                    def.path_display()
                )
            } else {
                format!(
                    "components {:?} ({}) and {:?} ({}) differ only by case",
                    first.name,
                    first.path_display(),
                    def.name,
                    def.path_display()
                )
            };
            return Err(CompileError::for_component(
                ErrorKind::Section,
                &def.name,
                &def.path_display(),
                &def.file_content,
                message,
            ));
        }
        seen.insert(def.name.to_lowercase(), def);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{MemoryLogger, NoopLogger};

    fn source(path: &str, content: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(path),
            content: content.to_string(),
        }
    }

    const CARD_FILE: &str = r#"<!-- * define "imports" -->
use crate::models::User;
<!-- * end -->

<!-- + define "Card" -->
<!-- | define "props" -->
title: string
<!-- | end -->
<!-- | define "html" -->
<div>{props.title}</div>
<!-- | end -->
<!-- + end -->

<!-- + define "Badge" -->
<!-- | define "html" --><span></span><!-- | end -->
<!-- + end -->
"#;

    #[test]
    fn test_extracts_imports_and_components() {
        let file = source("ui/card.html", CARD_FILE);
        let out = extract_components(&file, &Config::default(), &NoopLogger).unwrap();

        assert_eq!(out.imports.as_deref().map(str::trim), Some("use crate::models::User;"));
        assert_eq!(out.components.len(), 2);

        let card = &out.components[0];
        assert_eq!(card.name, "Card");
        assert_eq!(card.line, 5);
        assert_eq!(card.props_line, Some(6));
        assert_eq!(card.props_text.as_deref().map(str::trim), Some("title: string"));
        assert_eq!(card.markup.as_deref().map(str::trim), Some("<div>{props.title}</div>"));

        assert_eq!(out.components[1].name, "Badge");
        assert!(out.components[1].props_text.is_none());
    }

    #[test]
    fn test_unmatched_define_cites_file_and_line() {
        let file = source("ui/broken.html", "\n\n<!-- + define \"Card\" -->\n<p></p>\n");
        let err = extract_components(&file, &Config::default(), &NoopLogger).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Section);
        assert_eq!(err.file.as_deref(), Some("ui/broken.html"));
        assert_eq!(err.line, 3);
        assert!(err.to_string().starts_with("ui/broken.html:3: "));
    }

    #[test]
    fn test_sub_block_errors_use_file_lines() {
        let content = "<!-- + define \"Card\" -->\n<!-- | define \"html\" -->\n<p></p>\n<!-- + end -->";
        let err = extract_components(&source("c.html", content), &Config::default(), &NoopLogger).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_invalid_component_name() {
        let content = "<!-- + define \"my-card\" --><!-- + end -->";
        let err = extract_components(&source("c.html", content), &Config::default(), &NoopLogger).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Schema);
        assert!(err.message.contains("my-card"));
    }

    #[test]
    fn test_reserved_component_names() {
        for (name, tag) in [("Frame", "<frame>"), ("Image", "<image>"), ("TBody", "<tbody>"), ("Slot", "<slot>"), ("If", "<if>")] {
            let content = format!("\n<!-- + define \"{}\" --><!-- + end -->", name);
            let err = extract_components(&source("c.html", &content), &Config::default(), &NoopLogger).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Schema);
            assert_eq!(err.line, 2);
            assert!(err.message.contains(tag), "{}", err.message);
        }

        let content = "<!-- + define \"Panel\" --><!-- + end -->";
        assert!(extract_components(&source("c.html", content), &Config::default(), &NoopLogger).is_ok());
    }

    #[test]
    fn test_warnings_for_missing_html_and_unknown_blocks() {
        let content = "<!-- + define \"A\" --><!-- | define \"css\" -->x<!-- | end --><!-- + end -->";
        let logger = MemoryLogger::new();
        extract_components(&source("a.html", content), &Config::default(), &logger).unwrap();
        let warnings = logger.messages_at(log::Level::Warn);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("\"css\""));
        assert!(warnings[1].contains("no html block"));
    }

    #[test]
    fn test_duplicates_name_both_files() {
        let a = extract_components(&source("a.html", CARD_FILE), &Config::default(), &NoopLogger).unwrap();
        let b = extract_components(
            &source("b.html", "<!-- + define \"Card\" --><!-- + end -->"),
            &Config::default(),
            &NoopLogger,
        )
        .unwrap();
        let all: Vec<ComponentDefinition> = a.components.into_iter().chain(b.components).collect();

        let err = check_duplicates(&all).unwrap_err();
        assert!(err.message.contains("a.html"));
        assert!(err.message.contains("b.html"));
        assert_eq!(err.file.as_deref(), Some("b.html"));
    }

    #[test]
    fn test_duplicates_ignore_case() {
        let a = extract_components(&source("a.html", "<!-- + define \"card\" --><!-- + end -->"), &Config::default(), &NoopLogger).unwrap();
        let b = extract_components(&source("b.html", "<!-- + define \"Card\" --><!-- + end -->"), &Config::default(), &NoopLogger).unwrap();
        let all: Vec<ComponentDefinition> = a.components.into_iter().chain(b.components).collect();
        assert!(check_duplicates(&all).unwrap_err().message.contains("differ only by case"));
    }

    #[test]
    fn test_find_source_files_sorted() {
        let root = std::env::temp_dir().join(format!("htmlc-discovery-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("b/z.html"), "").unwrap();
        fs::write(root.join("a/y.html"), "").unwrap();
        fs::write(root.join("a/notes.txt"), "").unwrap();
        fs::write(root.join("top.html"), "").unwrap();

        let config = Config::new(&root, root.join("dist"));
        let files = find_source_files(&config).unwrap();
        let rel: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().display().to_string())
            .collect();
        assert_eq!(rel, vec!["a/y.html", "b/z.html", "top.html"]);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_source_dir() {
        let config = Config::new("/definitely/not/here", "dist");
        assert_eq!(find_source_files(&config).unwrap_err().kind, ErrorKind::Io);
    }
}
