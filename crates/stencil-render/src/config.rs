//! The persisted run configuration.
//!
//! A [`Config`] captures everything a run needs: variable and template
//! sources in order, delimiters, the exclusion pattern, the separator and
//! where output goes. It is saved as pretty JSON (YAML when JSON cannot
//! represent it) and loaded from either format.
//!
//! ```json
//! {
//!   "template_left_delim": "{{",
//!   "template_right_delim": "}}",
//!   "template_sources": [{"name": "main", "file": {"path": "main.tpl"}}],
//!   "vars_sources": [{"key": "app", "file": {"path": "app.yaml"}}]
//! }
//! ```
//!
//! [`Config::build_vars`] and [`Config::build_templates`] run the pipeline
//! and wrap failures with the index of the offending source.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::decode::Format;
use crate::error::{Error, FormatError, Result};
use crate::files;
use crate::funcs::FunctionRegistry;
use crate::host::Host;
use crate::template::{Delimiters, TemplateSource, TemplateSourceKind, Templates};
use crate::vars::{Vars, VarsSource};

/// Name of the template read from stdin when no template source is given.
pub const STDIN_TEMPLATE: &str = "stdin";

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where to write this configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_out_path: Option<PathBuf>,

    /// Glob of template names left out of every output.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub template_out_exclude: String,

    /// Template rendered between templates printed to stdout.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub template_out_print_separator: String,

    /// Print rendered templates to stdout.
    #[serde(skip_serializing_if = "is_false")]
    pub template_out_print: bool,

    /// Directory rendered templates are written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_out_path: Option<PathBuf>,

    pub template_left_delim: String,
    pub template_right_delim: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub template_sources: Vec<TemplateSource>,

    /// Print the resolved variables instead of rendering.
    #[serde(skip_serializing_if = "is_false")]
    pub vars_out_print: bool,

    /// Where to write the resolved variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars_out_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vars_sources: Vec<VarsSource>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Default for Config {
    fn default() -> Self {
        let delimiters = Delimiters::default();
        Self {
            config_out_path: None,
            template_out_exclude: String::new(),
            template_out_print_separator: String::new(),
            template_out_print: false,
            template_out_path: None,
            template_left_delim: delimiters.left,
            template_right_delim: delimiters.right,
            template_sources: Vec::new(),
            vars_out_print: false,
            vars_out_path: None,
            vars_sources: Vec::new(),
        }
    }
}

impl Config {
    /// Reads a configuration document, trying JSON first and then YAML.
    pub fn load<R: Read>(mut reader: R, origin: &str) -> Result<Self> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| Error::io(origin, e))?;
        if let Ok(config) = serde_json::from_slice(&bytes) {
            return Ok(config);
        }
        serde_yaml::from_slice(&bytes).map_err(|e| Error::Decode {
            origin: origin.to_string(),
            format: Format::Yaml,
            source: FormatError::Yaml(e),
        })
    }

    /// Reads a configuration file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = files::read(path)?;
        Self::load(bytes.as_slice(), &files::path_name(path))
    }

    /// Writes the configuration as pretty JSON (YAML if JSON encoding fails).
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        crate::output::save(self, writer)
    }

    pub fn delimiters(&self) -> Delimiters {
        Delimiters::new(&self.template_left_delim, &self.template_right_delim)
    }

    /// Adds a stdin template source when none is configured.
    pub fn ensure_template_source(&mut self) {
        if self.template_sources.is_empty() {
            self.template_sources
                .push(TemplateSource::stdin(STDIN_TEMPLATE));
        }
    }

    /// Loads every variable source in order.
    pub fn build_vars(&self, host: &Host) -> Result<Vars> {
        Vars::from_sources(&self.vars_sources, host)
    }

    /// Compiles every template source in order into a registry rendering
    /// against `vars`.
    pub fn build_templates(
        &self,
        functions: Arc<FunctionRegistry>,
        vars: &Vars,
        host: &Host,
    ) -> Result<Templates> {
        let mut templates = Templates::new(functions, self.delimiters())?.with_vars(vars);
        for (index, source) in self.template_sources.iter().enumerate() {
            source
                .load(&mut templates, host)
                .map_err(|e| Error::TemplateSource {
                    index,
                    name: source_label(source),
                    source: Box::new(e),
                })?;
        }
        Ok(templates)
    }
}

fn source_label(source: &TemplateSource) -> String {
    match &source.kind {
        TemplateSourceKind::FileGlob { glob } => glob.clone(),
        _ => source.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MockEnv, MockStdin};
    use serde_json::json;

    fn host() -> Host {
        Host::with_readers(MockEnv::new(), MockStdin::empty())
    }

    #[test]
    fn test_default_delimiters() {
        let config = Config::default();
        assert_eq!(config.delimiters(), Delimiters::new("{{", "}}"));
    }

    #[test]
    fn test_save_skips_empty_fields() {
        let mut out = Vec::new();
        Config::default().save(&mut out).unwrap();
        let saved: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            saved,
            json!({"template_left_delim": "{{", "template_right_delim": "}}"})
        );
    }

    #[test]
    fn test_round_trip() {
        let mut config = Config::default();
        config.template_out_exclude = "*.md".to_string();
        config.vars_out_print = true;
        config.vars_sources.push(VarsSource::env("APP_").under("app"));
        config
            .template_sources
            .push(TemplateSource::literal("t", "{{ x }}"));

        let mut out = Vec::new();
        config.save(&mut out).unwrap();
        let loaded = Config::load(out.as_slice(), "config.json").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_yaml() {
        let yaml = "template_out_print: true\nvars_sources:\n  - literal: {key: a, value: 1}\n";
        let config = Config::load(yaml.as_bytes(), "config.yaml").unwrap();
        assert!(config.template_out_print);
        assert_eq!(config.vars_sources, vec![VarsSource::literal("a", 1)]);
        assert_eq!(config.template_left_delim, "{{");
    }

    #[test]
    fn test_load_garbage() {
        let err = Config::load("[not, a, config]".as_bytes(), "bad").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_ensure_template_source() {
        let mut config = Config::default();
        config.ensure_template_source();
        assert_eq!(config.template_sources, vec![TemplateSource::stdin("stdin")]);

        config.ensure_template_source();
        assert_eq!(config.template_sources.len(), 1);
    }

    #[test]
    fn test_pipeline() {
        let mut config = Config::default();
        config.vars_sources.push(VarsSource::literal("name", "world"));
        config
            .template_sources
            .push(TemplateSource::literal("greet", "Hello {{ name }}"));

        let vars = config.build_vars(&host()).unwrap();
        let templates = config
            .build_templates(Arc::new(FunctionRegistry::standard()), &vars, &host())
            .unwrap();
        assert_eq!(templates.render_one("greet").unwrap(), "Hello world");
    }

    #[test]
    fn test_template_error_names_source() {
        let mut config = Config::default();
        config.template_sources.push(TemplateSource::literal("ok", "fine"));
        config
            .template_sources
            .push(TemplateSource::literal("broken", "{{ x"));

        let err = config
            .build_templates(Arc::new(FunctionRegistry::standard()), &Vars::new(), &host())
            .unwrap_err();
        assert!(
            matches!(err, Error::TemplateSource { index: 1, ref name, .. } if name == "broken")
        );
        assert!(matches!(err.root(), Error::Compile { .. }));
    }
}
