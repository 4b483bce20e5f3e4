//! Variable resolution and multi-template rendering.
//!
//! `stencil-render` gathers variables from files, literals, the environment
//! and stdin into one namespace, then renders any number of named templates
//! against it, either concatenated into one stream or each into its own file.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use stencil_render::{Config, FunctionRegistry, Host, TemplateSource, VarsSource};
//!
//! let mut config = Config::default();
//! config.vars_sources.push(VarsSource::literal("name", "world"));
//! config.template_sources.push(TemplateSource::literal("greet", "Hello {{ name }}"));
//!
//! let host = Host::real();
//! let vars = config.build_vars(&host)?;
//! let templates = config.build_templates(Arc::new(FunctionRegistry::standard()), &vars, &host)?;
//!
//! let mut out = Vec::new();
//! templates.render("", "", &mut out)?;
//! assert_eq!(out, b"Hello world");
//! # Ok::<(), stencil_render::Error>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! VarsSource* ──► decode ──► Vars ─────────────┐
//!                                              ▼
//! TemplateSource* ──► Templates (delimiters, FunctionRegistry) ──► output
//! ```
//!
//! - [`decode`]: JSON, then YAML, then TOML; the first parse that yields a
//!   mapping wins.
//! - [`vars`]: ordered, optionally namespaced, shallow merging.
//! - [`funcs`]: the functions templates can call, including `map` and
//!   `filter`, which call other functions by name.
//! - [`template`]: template sources, the registry, and both renderers.
//! - [`config`]: the persisted run configuration and the pipeline helpers.
//!
//! # Testing
//!
//! Environment and stdin access go through [`Host`], which accepts mock
//! readers:
//!
//! ```
//! use stencil_render::{Host, MockEnv, MockStdin, Vars, VarsSource};
//!
//! let host = Host::with_readers(MockEnv::new().with_var("APP_PORT", "80"), MockStdin::empty());
//! let vars = Vars::from_sources(&[VarsSource::env("APP_")], &host).unwrap();
//! assert_eq!(vars.get("APP_PORT").unwrap(), "80");
//! ```

pub mod config;
pub mod decode;
mod error;
pub mod files;
pub mod funcs;
pub mod host;
mod output;
pub mod template;
pub mod vars;

pub use config::Config;
pub use decode::{decode, Format, Map};
pub use error::{Error, FormatError, FuncError, Result};
pub use funcs::{FunctionRegistry, HigherOrder, Origin};
pub use host::{Host, MockEnv, MockStdin};
pub use output::save;
pub use template::{Delimiters, TemplateSource, TemplateSourceKind, Templates};
pub use vars::{Vars, VarsSource, VarsSourceKind};

/// Re-exported so host functions can be written without a direct
/// dependency on the template engine.
pub use minijinja::Value;
