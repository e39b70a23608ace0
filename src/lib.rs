//! # htmlc
//!
//! Build-time compiler from HTML component templates to Rust.
//!
//! A source file holds any number of components:
//!
//! ```text
//! <!-- * define "imports" -->
//! use crate::models::User;
//! <!-- * end -->
//!
//! <!-- + define "Card" -->
//! <!-- | define "props" -->
//! owner: User
//! <!-- | end -->
//! <!-- | define "html" -->
//! <div class="card">
//!   <header><slot name="header"/></header>
//!   <if condition={props.owner.admin}><b>admin</b></if>
//!   <for items={props.owner.tags} as="tag"><span>{tag}</span></for>
//! </div>
//! <!-- | end -->
//! <!-- + end -->
//! ```
//!
//! Each component becomes a props struct and a `<Name>Comp(props, attrs,
//! children) -> Node` constructor. Loops, conditionals, slots and component
//! composition are resolved into plain Rust at build time; the generated
//! code only depends on [`runtime`].
//!
//! ## Pipeline
//!
//! 1. [`discovery`] finds source files and splits them with [`section`].
//! 2. [`schema`] derives each component's props, declared and slot-derived.
//! 3. [`transform`] compiles each parsed template ([`parse`]) into an
//!    [`ir::Expr`] tree, printed once by [`codegen`].
//! 4. [`finalize`] assembles structs, constructors and imports into files.
//! 5. [`pipeline`] orchestrates, writes output and optionally runs
//!    [`validate`].

pub mod cache;
pub mod codegen;
pub mod component;
pub mod config;
pub mod discovery;
pub mod error;
pub mod expr;
pub mod finalize;
pub mod ir;
pub mod logger;
pub mod parse;
pub mod pipeline;
pub mod runtime;
pub mod schema;
pub mod section;
pub mod transform;
pub mod validate;

#[cfg(test)]
mod render_tests;

pub use config::{Config, DelimiterSet, Delimiters, OutputMode};
pub use error::{CompileError, ErrorKind, Result};
pub use logger::{LogFacade, Logger, MemoryLogger, NoopLogger};
pub use pipeline::{compile_sources, transpile, Compiled, TranspileReport};
pub use runtime::{Attrs, Node, ToNode};
