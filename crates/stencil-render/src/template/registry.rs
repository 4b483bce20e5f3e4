//! The compiled template registry and its renderers.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use glob::Pattern;
use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::files;
use crate::funcs::{context_map, FunctionRegistry};
use crate::vars::Vars;

/// Name under which the separator template is compiled.
const SEPARATOR: &str = "<separator>";

/// Variable delimiters shared by every template in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Delimiters {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Engine syntax for this pair.
    ///
    /// The default pair keeps the standard `{% %}` and `{# #}` tags. Any
    /// other pair derives them from itself, so `<< >>` gives `<<% %>>` and
    /// `<<# #>>`, and `{%` or `{#` in the text is plain output.
    fn syntax(&self) -> std::result::Result<SyntaxConfig, minijinja::Error> {
        if *self == Self::default() {
            return Ok(SyntaxConfig::default());
        }
        SyntaxConfig::builder()
            .variable_delimiters(self.left.clone(), self.right.clone())
            .block_delimiters(format!("{}%", self.left), format!("%{}", self.right))
            .comment_delimiters(format!("{}#", self.left), format!("#{}", self.right))
            .build()
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

/// A registry of named, compiled templates.
///
/// Names are kept in registration order, which is also the render order.
/// Registering a name a second time replaces the compiled body but keeps
/// the name at its original position.
pub struct Templates {
    env: Environment<'static>,
    functions: Arc<FunctionRegistry>,
    delimiters: Delimiters,
    names: Vec<String>,
    context: Value,
}

impl Templates {
    /// Creates an empty registry.
    ///
    /// Fails with [`Error::Compile`] when the delimiters are unusable (empty,
    /// or clashing with the block and comment delimiters).
    pub fn new(functions: Arc<FunctionRegistry>, delimiters: Delimiters) -> Result<Self> {
        let delimiter_error = |source| Error::Compile {
            name: format!("delimiters {} {}", delimiters.left, delimiters.right),
            source,
        };
        if delimiters.left.is_empty() || delimiters.right.is_empty() {
            return Err(delimiter_error(minijinja::Error::new(
                ErrorKind::SyntaxError,
                "delimiters must not be empty",
            )));
        }
        let syntax = delimiters.syntax().map_err(delimiter_error)?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        FunctionRegistry::install(&functions, &mut env);

        Ok(Self {
            env,
            functions,
            delimiters,
            names: Vec::new(),
            context: Value::from(()),
        })
    }

    /// Sets the variables templates are rendered against.
    pub fn set_vars(&mut self, vars: &Vars) {
        self.context = context_map(vars.as_map());
    }

    /// Builder form of [`set_vars`](Self::set_vars).
    pub fn with_vars(mut self, vars: &Vars) -> Self {
        self.set_vars(vars);
        self
    }

    /// Compiles `text` and registers it as `name`.
    pub fn add_template(&mut self, name: impl Into<String>, text: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.env
            .add_template_owned(name.clone(), text.into())
            .map_err(|source| Error::Compile {
                name: name.clone(),
                source,
            })?;
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        Ok(())
    }

    /// Registered names in registration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Renders every non-excluded template to `out`, in registration order,
    /// with the rendered `separator` template between consecutive outputs.
    ///
    /// An empty `exclude` pattern excludes nothing. The separator is
    /// compiled once, before any template runs.
    pub fn render<W: Write>(&self, exclude: &str, separator: &str, mut out: W) -> Result<()> {
        let exclude = compile_exclude(exclude)?;

        let mut separator_env = self.env.clone();
        separator_env
            .add_template_owned(SEPARATOR, separator.to_string())
            .map_err(|source| Error::Compile {
                name: SEPARATOR.to_string(),
                source,
            })?;

        let mut first = true;
        for name in self.included(exclude.as_ref()) {
            if !first {
                execute(&separator_env, SEPARATOR, &self.context, &mut out)?;
            }
            first = false;
            execute(&self.env, name, &self.context, &mut out)?;
        }
        out.flush().map_err(|e| Error::io("<output>", e))
    }

    /// Renders every non-excluded template to `dir/<name>`.
    ///
    /// Intermediate directories are created and an existing file at the
    /// target path is removed first. The first failure stops the run; files
    /// already written stay in place.
    pub fn render_to_dir(&self, exclude: &str, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let exclude = compile_exclude(exclude)?;
        let dir = dir.as_ref();

        let mut written = Vec::new();
        for name in self.included(exclude.as_ref()) {
            let path = output_path(dir, name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(&path, e)),
            }

            let file = fs::File::create(&path).map_err(|e| Error::io(&path, e))?;
            let mut out = BufWriter::new(file);
            execute(&self.env, name, &self.context, &mut out)?;
            out.flush().map_err(|e| Error::io(&path, e))?;
            written.push(path);
        }
        Ok(written)
    }

    /// Renders a single template to a string.
    pub fn render_one(&self, name: &str) -> Result<String> {
        let mut out = Vec::new();
        execute(&self.env, name, &self.context, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn included<'a>(&'a self, exclude: Option<&'a Pattern>) -> impl Iterator<Item = &'a str> + 'a {
        self.names
            .iter()
            .map(String::as_str)
            .filter(move |name| !exclude.is_some_and(|p| files::matches(p, name)))
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("names", &self.names)
            .field("delimiters", &self.delimiters)
            .finish_non_exhaustive()
    }
}

fn compile_exclude(pattern: &str) -> Result<Option<Pattern>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    files::compile_pattern(pattern).map(Some)
}

fn execute<W: Write>(
    env: &Environment<'static>,
    name: &str,
    context: &Value,
    out: &mut W,
) -> Result<()> {
    let template = env.get_template(name).map_err(|e| Error::from_render(name, e))?;
    template
        .render_to_write(context, out)
        .map_err(|e| Error::from_render(name, e))?;
    Ok(())
}

/// `dir` joined with the template name. Root, prefix and `..` components of
/// the name are dropped, so every path lands inside `dir`.
fn output_path(dir: &Path, name: &str) -> PathBuf {
    let mut path = dir.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::ParentDir
            | Component::CurDir
            | Component::RootDir
            | Component::Prefix(_) => {}
        }
    }
    path
}
