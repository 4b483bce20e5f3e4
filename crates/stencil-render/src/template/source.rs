//! Template sources.
//!
//! | Kind | Registers |
//! |------|-----------|
//! | `literal` | `name` with the given text |
//! | `file` | `name` with the file's content |
//! | `file_glob` | one template per matching path, named by the path |
//! | `env` | `name` with the value of an environment variable (empty if unset) |
//! | `stdin` | `name` with the content of stdin |

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Templates;
use crate::error::{Error, Result};
use crate::files;
use crate::host::Host;

/// One configured template source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSource {
    /// Registered name. Unused by `file_glob`, which names templates by path.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(flatten)]
    pub kind: TemplateSourceKind,
}

/// Where template text comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSourceKind {
    Literal { text: String },
    File { path: PathBuf },
    FileGlob { glob: String },
    Env { key: String },
    Stdin {},
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, kind: TemplateSourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn literal(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, TemplateSourceKind::Literal { text: text.into() })
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(name, TemplateSourceKind::File { path: path.into() })
    }

    pub fn file_glob(glob: impl Into<String>) -> Self {
        Self::new(String::new(), TemplateSourceKind::FileGlob { glob: glob.into() })
    }

    pub fn env(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(name, TemplateSourceKind::Env { key: key.into() })
    }

    pub fn stdin(name: impl Into<String>) -> Self {
        Self::new(name, TemplateSourceKind::Stdin {})
    }

    /// Compiles this source's templates into `templates` and returns the
    /// names it registered.
    ///
    /// A `file_glob` that fails part-way keeps the templates it registered
    /// before the failing path.
    pub fn load(&self, templates: &mut Templates, host: &Host) -> Result<Vec<String>> {
        match &self.kind {
            TemplateSourceKind::Literal { text } => {
                templates.add_template(self.name.clone(), text.clone())?;
            }
            TemplateSourceKind::File { path } => {
                templates.add_template(self.name.clone(), files::read_string(path)?)?;
            }
            TemplateSourceKind::FileGlob { glob } => {
                let mut names = Vec::new();
                for path in files::expand(glob)? {
                    let name = files::path_name(&path);
                    templates.add_template(name.clone(), files::read_string(&path)?)?;
                    names.push(name);
                }
                return Ok(names);
            }
            TemplateSourceKind::Env { key } => {
                let text = host.env().var(key).unwrap_or_default();
                templates.add_template(self.name.clone(), text)?;
            }
            TemplateSourceKind::Stdin {} => {
                let bytes = host
                    .stdin()
                    .read_to_end()
                    .map_err(|e| Error::io("-", e))?;
                templates.add_template(
                    self.name.clone(),
                    String::from_utf8_lossy(&bytes).into_owned(),
                )?;
            }
        }
        Ok(vec![self.name.clone()])
    }

    /// Short human-readable description, used in diagnostics.
    pub fn describe(&self) -> String {
        match &self.kind {
            TemplateSourceKind::Literal { .. } => format!("template '{}'", self.name),
            TemplateSourceKind::File { path } => {
                format!("template '{}' from {}", self.name, path.display())
            }
            TemplateSourceKind::FileGlob { glob } => format!("templates matching '{glob}'"),
            TemplateSourceKind::Env { key } => {
                format!("template '{}' from environment '{key}'", self.name)
            }
            TemplateSourceKind::Stdin {} => format!("template '{}' from stdin", self.name),
        }
    }
}
