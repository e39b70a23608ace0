//! Pipeline Orchestrator
//!
//! Ties the stages together: discover → section → check duplicates → build
//! schemas → freeze the component table → compile → assemble → write →
//! validate. Nothing is written until every component has compiled.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::cache::{is_up_to_date, Manifest};
use crate::codegen::print_expr;
use crate::component::{ComponentDefinition, ComponentTable, SourceFile};
use crate::config::Config;
use crate::discovery::{check_duplicates, extract_components, find_source_files, read_source};
use crate::error::{CompileError, ErrorKind, Result};
use crate::finalize::{assemble, build_unit, parse_imports, ImportSpec, OutputFile};
use crate::logger::Logger;
use crate::parse::{parse_template, DocumentNode, TemplateNode};
use crate::schema::{build_schema, PropSchema};
use crate::transform::{compile_component, CompileContext};
use crate::validate::{validate_package, ComponentOrigin};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileReport {
    /// Component names, sorted.
    pub components: Vec<String>,
    pub files: Vec<PathBuf>,
    /// The incremental check found nothing to do.
    pub skipped: bool,
    pub duration: Duration,
}

/// Result of compiling a set of sources in memory.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub components: Vec<String>,
    pub files: Vec<OutputFile>,
    /// Generated file name to originating component.
    pub origins: BTreeMap<String, ComponentOrigin>,
}

/// Run the whole pipeline as configured.
pub fn transpile(config: &Config, logger: &dyn Logger) -> Result<TranspileReport> {
    config.check()?;
    let started = Instant::now();
    let out_dir = config.out_dir();

    logger.info(&format!(
        "transpiling {} -> {}",
        config.src.display(),
        out_dir.display()
    ));

    let paths = find_source_files(config)?;
    if config.incremental && is_up_to_date(config, &paths) {
        logger.info("sources unchanged since the last run; skipping");
        return Ok(TranspileReport {
            components: Manifest::load(&out_dir).map(|m| m.components).unwrap_or_default(),
            files: Vec::new(),
            skipped: true,
            duration: started.elapsed(),
        });
    }

    let mut sources = Vec::with_capacity(paths.len());
    for path in &paths {
        logger.debug(&format!("reading {}", path.display()));
        sources.push(read_source(path)?);
    }

    let compiled = compile_sources(&sources, config, logger)?;
    let written = write_output(&out_dir, &compiled.files)?;

    Manifest::new(
        config,
        &paths,
        compiled.components.clone(),
        compiled.files.iter().map(|f| f.name.clone()).collect(),
    )
    .write(&out_dir)
    .map_err(|e| {
        CompileError::io(out_dir.display().to_string(), format!("Failed to write manifest: {}", e))
    })?;

    if config.validate {
        logger.info("validating generated code with cargo check");
        validate_package(&out_dir, config.validate_timeout(), &compiled.origins)?;
    }

    let duration = started.elapsed();
    logger.info(&format!(
        "transpiled {} components into {} files in {:?}",
        compiled.components.len(),
        written.len(),
        duration
    ));

    Ok(TranspileReport {
        components: compiled.components,
        files: written,
        skipped: false,
        duration,
    })
}

/// Everything between reading the sources and writing files.
pub fn compile_sources(sources: &[SourceFile], config: &Config, logger: &dyn Logger) -> Result<Compiled> {
    let mut sources: Vec<&SourceFile> = sources.iter().collect();
    sources.sort_by(|a, b| a.path.cmp(&b.path));

    let mut imports: Vec<ImportSpec> = Vec::new();
    let mut defs: Vec<ComponentDefinition> = Vec::new();
    for source in sources {
        let extracted = extract_components(source, config, logger)?;
        if let Some(text) = &extracted.imports {
            let parsed = parse_imports(text).map_err(|msg| {
                CompileError::new(ErrorKind::Section, msg).with_file(source.path.display().to_string())
            })?;
            imports.extend(parsed);
        }
        logger.debug(&format!(
            "{}: {} components",
            source.path.display(),
            extracted.components.len()
        ));
        defs.extend(extracted.components);
    }

    check_duplicates(&defs)?;
    defs.sort_by(|a, b| a.name.cmp(&b.name));

    let names: BTreeSet<String> = defs.iter().map(|d| d.name.to_lowercase()).collect();

    let mut trees: Vec<TemplateNode> = Vec::with_capacity(defs.len());
    let mut schemas: Vec<PropSchema> = Vec::with_capacity(defs.len());
    for def in &defs {
        let tree = match &def.markup {
            Some(markup) => parse_template(markup)
                .map_err(|e| component_error(ErrorKind::Compile, def, e.message))?,
            None => TemplateNode::Document(DocumentNode { children: Vec::new() }),
        };
        let schema = build_schema(def.props_text.as_deref(), &tree, &names).map_err(|e| {
            let err = component_error(ErrorKind::Schema, def, e.message);
            match def.props_line {
                Some(props_line) if e.line > 0 => err.with_line(props_line + e.line - 1),
                _ => err,
            }
        })?;
        trees.push(tree);
        schemas.push(schema);
    }

    let table = ComponentTable::build(defs.iter().map(|d| d.name.as_str()).zip(schemas.iter()));

    let mut units = Vec::with_capacity(defs.len());
    for ((def, tree), schema) in defs.iter().zip(&trees).zip(&schemas) {
        let ctx = CompileContext {
            component: &def.name,
            schema,
            table: &table,
            logger,
        };
        let expr = compile_component(tree, &ctx)
            .map_err(|e| component_error(ErrorKind::Compile, def, e.message))?;
        units.push(build_unit(&def.name, schema, &print_expr(&expr)));
    }

    let files = assemble(&mut units, &imports, config, logger);

    let by_name: BTreeMap<&str, &ComponentDefinition> = defs.iter().map(|d| (d.name.as_str(), d)).collect();
    let origins = files
        .iter()
        .filter_map(|file| {
            let def = by_name.get(file.component.as_deref()?)?;
            Some((
                file.name.clone(),
                ComponentOrigin {
                    component: def.name.clone(),
                    source_path: def.path_display(),
                    source_content: def.file_content.clone(),
                },
            ))
        })
        .collect();

    Ok(Compiled {
        components: defs.iter().map(|d| d.name.clone()).collect(),
        files,
        origins,
    })
}

fn component_error(kind: ErrorKind, def: &ComponentDefinition, message: String) -> CompileError {
    CompileError::for_component(kind, &def.name, &def.path_display(), &def.file_content, message)
}

/// Replace the generated `.rs` files in `out_dir` with `files`.
fn write_output(out_dir: &Path, files: &[OutputFile]) -> Result<Vec<PathBuf>> {
    let io_err = |path: &Path, what: &str, e: std::io::Error| {
        CompileError::io(path.display().to_string(), format!("{}: {}", what, e))
    };

    fs::create_dir_all(out_dir).map_err(|e| io_err(out_dir, "Failed to create output directory", e))?;

    let existing = fs::read_dir(out_dir).map_err(|e| io_err(out_dir, "Failed to list output directory", e))?;
    for entry in existing.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() && path.extension().map(|e| e == "rs").unwrap_or(false) {
            fs::remove_file(&path).map_err(|e| io_err(&path, "Failed to remove stale file", e))?;
        }
    }

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = out_dir.join(&file.name);
        fs::write(&path, &file.contents).map_err(|e| io_err(&path, "Failed to write file", e))?;
        written.push(path);
    }
    Ok(written)
}
