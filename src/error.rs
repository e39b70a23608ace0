//! Error Module for htmlc
//!
//! Every failure in the pipeline surfaces as a [`CompileError`]: a category plus
//! the attribution fields needed to print `file:line: message` diagnostics.
//! Stage-local errors (sectioning, schema, node compilation) are small structs
//! that the orchestrator converts once it knows the owning component and file.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CATEGORIES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Unreadable source or unwritable destination.
    Io,
    /// Invalid configuration file or options.
    Config,
    /// Unbalanced, unknown or duplicate `define` blocks.
    Section,
    /// Malformed prop declarations, nameless slots, invalid component names.
    Schema,
    /// Malformed `for` / `if` / `slot` usage and other markup errors.
    Compile,
    /// Source assembly failures (formatting failures are warnings, not errors).
    Assembly,
    /// The target toolchain rejected the generated package.
    Validation,
    /// The target toolchain did not finish within the configured timeout.
    ValidationTimeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
            ErrorKind::Section => "section",
            ErrorKind::Schema => "schema",
            ErrorKind::Compile => "compile",
            ErrorKind::Assembly => "assembly",
            ErrorKind::Validation => "validation",
            ErrorKind::ValidationTimeout => "validation-timeout",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub component: Option<String>,
    pub file: Option<String>,
    /// 1-based line, 0 when unknown.
    pub line: u32,
    pub message: String,
    pub snippet: Option<String>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CompileError {
            kind,
            component: None,
            file: None,
            line: 0,
            message: message.into(),
            snippet: None,
        }
    }

    pub fn io(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message).with_file(file)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        let snippet = snippet.into();
        if !snippet.is_empty() {
            self.snippet = Some(snippet);
        }
        self
    }

    /// Attribute an error to a component defined in `file_content`.
    ///
    /// The line is best-effort: the first occurrence of `define "Name"` in the
    /// owning file, with two lines of context on each side as the snippet.
    pub fn for_component(
        kind: ErrorKind,
        component: &str,
        file: &str,
        file_content: &str,
        message: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(kind, message)
            .with_component(component)
            .with_file(file);
        if let Some(line) = line_for_component(file_content, component) {
            err.line = line;
            if let Some(snippet) = snippet_at_line(file_content, line, 2) {
                err = err.with_snippet(snippet);
            }
        }
        err
    }

    /// Serialize for tooling that wants structured diagnostics.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), line) if line > 0 => write!(f, "{}:{}: {}", file, line, self.message)?,
            (Some(file), _) => write!(f, "{}: {}", file, self.message)?,
            (None, _) => write!(f, "{}", self.message)?,
        }
        if self.file.is_some() {
            if let Some(snippet) = &self.snippet {
                write!(f, "\n{}", snippet)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

pub type Result<T> = std::result::Result<T, CompileError>;

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE ATTRIBUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// 1-based line of the first `define "name"` in `content`.
pub fn line_for_component(content: &str, name: &str) -> Option<u32> {
    let needle = format!("define \"{}\"", name);
    content
        .find(&needle)
        .map(|idx| line_at_offset(content, idx))
}

/// 1-based line containing byte offset `offset`.
pub fn line_at_offset(content: &str, offset: usize) -> u32 {
    let end = offset.min(content.len());
    1 + content.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() as u32
}

/// The lines around `line` (1-based), `context` lines on each side.
pub fn snippet_at_line(content: &str, line: u32, context: u32) -> Option<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    if line < 1 || line as usize > lines.len() {
        return None;
    }
    let idx = (line - 1) as usize;
    let start = idx.saturating_sub(context as usize);
    let end = (idx + context as usize + 1).min(lines.len());
    Some(lines[start..end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "<!-- + define \"A\" -->\n<!-- | define \"html\" -->\n<div></div>\n<!-- | end -->\n<!-- + end -->\n<!-- + define \"B\" -->\n<!-- + end -->";

    #[test]
    fn test_line_for_component() {
        assert_eq!(line_for_component(FILE, "A"), Some(1));
        assert_eq!(line_for_component(FILE, "B"), Some(6));
        assert_eq!(line_for_component(FILE, "C"), None);
    }

    #[test]
    fn test_snippet_window_is_clamped() {
        let snippet = snippet_at_line(FILE, 1, 2).unwrap();
        assert_eq!(snippet.lines().count(), 3);
        assert!(snippet.starts_with("<!-- + define \"A\" -->"));
        assert!(snippet_at_line(FILE, 0, 2).is_none());
        assert!(snippet_at_line(FILE, 99, 2).is_none());
    }

    #[test]
    fn test_display_formats() {
        let err = CompileError::new(ErrorKind::Compile, "boom");
        assert_eq!(err.to_string(), "boom");

        let err = err.with_file("a.html");
        assert_eq!(err.to_string(), "a.html: boom");

        let err = err.with_line(3).with_snippet("ctx");
        assert_eq!(err.to_string(), "a.html:3: boom\nctx");
    }

    #[test]
    fn test_for_component_attribution() {
        let err = CompileError::for_component(ErrorKind::Schema, "B", "comps/b.html", FILE, "bad");
        assert_eq!(err.component.as_deref(), Some("B"));
        assert_eq!(err.file.as_deref(), Some("comps/b.html"));
        assert_eq!(err.line, 6);
        assert!(err.snippet.unwrap().contains("define \"B\""));
    }

    #[test]
    fn test_json_carries_category() {
        let err = CompileError::new(ErrorKind::ValidationTimeout, "hung").with_file("x.rs");
        let value: serde_json::Value = serde_json::from_str(&err.to_json()).unwrap();
        assert_eq!(value["kind"], "validation-timeout");
        assert_eq!(value["file"], "x.rs");
        assert_eq!(value["line"], 0);
    }
}
