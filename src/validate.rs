//! Downstream validation.
//!
//! Runs `cargo check` over the crate that contains the generated module and
//! maps the first error back to the component that produced the offending
//! file. The check is bounded by a timeout; a hung toolchain is reported as
//! [`ErrorKind::ValidationTimeout`].

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{CompileError, ErrorKind, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

lazy_static! {
    static ref DIAGNOSTIC_RE: Regex = Regex::new(
        r"^(?P<file>[^\s:][^:]*\.rs):(?P<line>\d+):(?P<col>\d+): error(?:\[[A-Z0-9]+\])?: (?P<msg>.+)$"
    )
    .unwrap();
}

/// Where a generated file came from.
#[derive(Debug, Clone)]
pub struct ComponentOrigin {
    pub component: String,
    pub source_path: String,
    pub source_content: Rc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub message: String,
}

/// First `file:line:col: error: message` line of short-format cargo output.
pub fn parse_diagnostic(output: &str) -> Option<Diagnostic> {
    output.lines().find_map(|line| {
        let caps = DIAGNOSTIC_RE.captures(line.trim())?;
        Some(Diagnostic {
            file: caps["file"].to_string(),
            line: caps["line"].parse().unwrap_or(0),
            message: caps["msg"].to_string(),
        })
    })
}

/// `path` made absolute against `base`, with `.` and `..` resolved lexically.
fn resolve(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Nearest ancestor of `dir` (inclusive) holding a `Cargo.toml`.
pub fn find_crate_root(dir: &Path) -> Option<PathBuf> {
    let absolute = resolve(&std::env::current_dir().ok()?, dir);
    absolute
        .ancestors()
        .find(|p| p.join("Cargo.toml").is_file())
        .map(Path::to_path_buf)
}

/// Turn a diagnostic into an error, attributed to the component whose
/// generated file it points at. Only files directly in `out_dir` are
/// generated; `root` is the directory cargo reported paths against.
pub fn remap_diagnostic(
    diag: &Diagnostic,
    root: &Path,
    out_dir: &Path,
    origins: &BTreeMap<String, ComponentOrigin>,
) -> CompileError {
    let file = resolve(root, Path::new(&diag.file));
    let origin = if file.parent() == Some(resolve(root, out_dir).as_path()) {
        file.file_name()
            .and_then(|n| n.to_str())
            .and_then(|name| origins.get(name))
    } else {
        None
    };

    match origin {
        Some(origin) => CompileError::for_component(
            ErrorKind::Validation,
            &origin.component,
            &origin.source_path,
            &origin.source_content,
            format!(
                "generated code does not compile: {} (at {}:{})",
                diag.message, diag.file, diag.line
            ),
        ),
        None => CompileError::new(ErrorKind::Validation, diag.message.clone())
            .with_file(diag.file.clone())
            .with_line(diag.line),
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut text);
        }
        text
    })
}

/// Type-check the crate containing `out_dir`.
///
/// `origins` maps generated file names (`card.rs`) to their components.
pub fn validate_package(
    out_dir: &Path,
    timeout: Duration,
    origins: &BTreeMap<String, ComponentOrigin>,
) -> Result<()> {
    let root = find_crate_root(out_dir).ok_or_else(|| {
        CompileError::new(
            ErrorKind::Validation,
            "no Cargo.toml found above the output directory",
        )
        .with_file(out_dir.display().to_string())
    })?;

    let mut child = Command::new("cargo")
        .args(["check", "--quiet", "--message-format", "short"])
        .current_dir(&root)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            CompileError::new(ErrorKind::Validation, format!("could not run cargo: {}", e))
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CompileError::new(
                    ErrorKind::ValidationTimeout,
                    format!("cargo check did not finish within {}s", timeout.as_secs()),
                )
                .with_file(root.display().to_string()));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(CompileError::new(
                    ErrorKind::Validation,
                    format!("waiting for cargo failed: {}", e),
                ))
            }
        }
    };

    if status.success() {
        return Ok(());
    }

    let output = format!(
        "{}\n{}",
        stderr.join().unwrap_or_default(),
        stdout.join().unwrap_or_default()
    );
    match parse_diagnostic(&output) {
        Some(diag) => {
            let out_dir = std::env::current_dir()
                .map(|cwd| resolve(&cwd, out_dir))
                .unwrap_or_else(|_| out_dir.to_path_buf());
            Err(remap_diagnostic(&diag, &root, &out_dir, origins))
        }
        None => {
            let tail: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).take(5).collect();
            Err(CompileError::new(ErrorKind::Validation, "cargo check failed")
                .with_file(root.display().to_string())
                .with_snippet(tail.join("\n")))
        }
    }
}
