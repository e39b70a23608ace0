use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::Config;

pub const MANIFEST_FILE: &str = ".htmlc-manifest.json";
const MANIFEST_VERSION: u32 = 1;

/// Written next to the generated files after every successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    /// Hash of the options that change the generated text.
    pub fingerprint: String,
    /// Source files the output was built from, sorted.
    pub sources: Vec<String>,
    pub components: Vec<String>,
    pub files: Vec<String>,
}

/// The subset of [`Config`] that affects generated output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions<'a> {
    package: &'a str,
    mode: crate::config::OutputMode,
    format: bool,
    runtime_path: &'a str,
    extensions: &'a [String],
    delimiters: &'a crate::config::DelimiterSet,
}

pub fn compute_hash(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn options_fingerprint(config: &Config) -> String {
    let options = OutputOptions {
        package: &config.package,
        mode: config.mode,
        format: config.format,
        runtime_path: &config.runtime_path,
        extensions: &config.extensions,
        delimiters: &config.delimiters,
    };
    let json = serde_json::to_string(&options).unwrap_or_default();
    compute_hash(&json)
}

impl Manifest {
    pub fn new(config: &Config, sources: &[PathBuf], components: Vec<String>, files: Vec<String>) -> Self {
        Manifest {
            version: MANIFEST_VERSION,
            fingerprint: options_fingerprint(config),
            sources: source_list(sources),
            components,
            files,
        }
    }

    pub fn path(out_dir: &Path) -> PathBuf {
        out_dir.join(MANIFEST_FILE)
    }

    /// `None` when missing or unreadable; a stale or corrupt manifest only
    /// forces a rebuild.
    pub fn load(out_dir: &Path) -> Option<Self> {
        let data = fs::read_to_string(Self::path(out_dir)).ok()?;
        serde_json::from_str(&data).ok()
    }

    pub fn write(&self, out_dir: &Path) -> std::io::Result<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        fs::write(Self::path(out_dir), data)
    }
}

fn source_list(sources: &[PathBuf]) -> Vec<String> {
    let mut list: Vec<String> = sources.iter().map(|p| p.display().to_string()).collect();
    list.sort();
    list
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Newest modification time among the `.rs` files directly in `out_dir`.
fn newest_generated(out_dir: &Path) -> Option<SystemTime> {
    fs::read_dir(out_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().map(|e| e == "rs").unwrap_or(false))
        .filter_map(|p| modified(&p))
        .max()
}

/// True when the previous run used the same output options and the same set
/// of sources, and no source is newer than the newest generated file.
pub fn is_up_to_date(config: &Config, sources: &[PathBuf]) -> bool {
    if sources.is_empty() {
        return false;
    }
    let out_dir = config.out_dir();
    let Some(generated) = newest_generated(&out_dir) else {
        return false;
    };
    match Manifest::load(&out_dir) {
        Some(m)
            if m.version == MANIFEST_VERSION
                && m.fingerprint == options_fingerprint(config)
                && m.sources == source_list(sources) => {}
        _ => return false,
    }
    sources
        .iter()
        .all(|src| modified(src).map(|t| t <= generated).unwrap_or(false))
}
