//! Configuration for a transpile run.
//!
//! A [`Config`] can be built in code or loaded from a JSON file; every field
//! has a default so a config file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CompileError, Result};

pub const DEFAULT_PACKAGE: &str = "components";
pub const DEFAULT_RUNTIME_PATH: &str = "htmlc::runtime";

// ═══════════════════════════════════════════════════════════════════════════════
// DELIMITERS
// ═══════════════════════════════════════════════════════════════════════════════

/// An open/close marker pair, e.g. `<!-- +` and ` -->`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Delimiters {
    pub fn new(open: &str, close: &str) -> Self {
        Delimiters {
            open: open.to_string(),
            close: close.to_string(),
        }
    }
}

/// Marker vocabularies for the three structural levels of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimiterSet {
    /// File level: the `imports` block.
    pub file: Delimiters,
    /// Component level: one `define "Name"` block per component.
    pub component: Delimiters,
    /// Inside a component: `props` and `html` sub-blocks.
    pub block: Delimiters,
}

impl Default for DelimiterSet {
    fn default() -> Self {
        DelimiterSet {
            file: Delimiters::new("<!-- *", " -->"),
            component: Delimiters::new("<!-- +", " -->"),
            block: Delimiters::new("<!-- |", " -->"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputMode {
    /// `mod.rs` plus one file per component, each importing only what it uses.
    PerComponent,
    /// Everything in a single `mod.rs`.
    SingleFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Directory scanned recursively for component files.
    pub src: PathBuf,
    /// Output root; generated files land in `dist/<package>/`.
    pub dist: PathBuf,
    /// Name of the generated module directory.
    pub package: String,
    pub mode: OutputMode,
    /// Run `rustfmt` over generated files.
    pub format: bool,
    /// Run `cargo check` after writing the output.
    pub validate: bool,
    pub validate_timeout_secs: u64,
    /// Skip the run when no source is newer than the generated files.
    pub incremental: bool,
    /// Path the generated code imports the rendering runtime from.
    pub runtime_path: String,
    /// Source file extensions, without the dot.
    pub extensions: Vec<String>,
    pub delimiters: DelimiterSet,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            src: PathBuf::from("src"),
            dist: PathBuf::from("dist"),
            package: DEFAULT_PACKAGE.to_string(),
            mode: OutputMode::PerComponent,
            format: true,
            validate: false,
            validate_timeout_secs: 120,
            incremental: false,
            runtime_path: DEFAULT_RUNTIME_PATH.to_string(),
            extensions: vec!["html".to_string()],
            delimiters: DelimiterSet::default(),
        }
    }
}

impl Config {
    pub fn new(src: impl Into<PathBuf>, dist: impl Into<PathBuf>) -> Self {
        Config {
            src: src.into(),
            dist: dist.into(),
            ..Default::default()
        }
    }

    /// Load a JSON config file. Relative `src`/`dist` stay relative to the
    /// process working directory.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| {
            CompileError::io(path.display().to_string(), format!("Failed to read config: {}", e))
        })?;
        let config = Self::from_json(&data)
            .map_err(|e| e.with_file(path.display().to_string()))?;
        Ok(config)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(data)
            .map_err(|e| CompileError::config(format!("Invalid config: {}", e)).with_line(e.line() as u32))?;
        config.check()?;
        Ok(config)
    }

    /// Reject option combinations that would produce unusable output.
    pub fn check(&self) -> Result<()> {
        if !is_identifier(&self.package) {
            return Err(CompileError::config(format!(
                "package {:?} is not a valid module name",
                self.package
            )));
        }
        if self.runtime_path.trim().is_empty() {
            return Err(CompileError::config("runtimePath must not be empty"));
        }
        if self.extensions.is_empty() {
            return Err(CompileError::config("extensions must not be empty"));
        }
        for (level, d) in [
            ("file", &self.delimiters.file),
            ("component", &self.delimiters.component),
            ("block", &self.delimiters.block),
        ] {
            if d.open.is_empty() || d.close.is_empty() {
                return Err(CompileError::config(format!(
                    "{} delimiters must have a non-empty open and close marker",
                    level
                )));
            }
        }
        Ok(())
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dist.join(&self.package)
    }

    pub fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.validate_timeout_secs)
    }

    pub fn single_file(&self) -> bool {
        self.mode == OutputMode::SingleFile
    }

    pub fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
