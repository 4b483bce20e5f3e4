//! Variable sources.
//!
//! A [`VarsSource`] describes where one batch of variables comes from and
//! optionally names the namespace key the batch is nested under. Sources
//! are plain configuration: they serialize into the persisted config
//! document and are consumed once, in order, by [`Vars::from_sources`].
//!
//! | Kind | Batch produced |
//! |------|----------------|
//! | `literal` | `{key: value}` |
//! | `file` | the decoded mapping of the file (JSON, YAML or TOML) |
//! | `stdin` | the decoded mapping of stdin |
//! | `file_slurp` | `{name: <file content as a string>}` (`-` reads stdin) |
//! | `files_slurp` | `{<path>: <content>}` for every path matching a glob |
//! | `env` | every environment entry whose name starts with `prefix` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Vars;
use crate::decode::{self, Map};
use crate::error::{Error, Result};
use crate::files;
use crate::host::Host;

/// One configured batch of variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarsSource {
    /// Namespace key the batch is nested under; top level when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(flatten)]
    pub kind: VarsSourceKind,
}

/// Where a batch of variables comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarsSourceKind {
    /// A single variable given directly.
    Literal { key: String, value: Value },

    /// A structured payload file.
    File { path: PathBuf },

    /// A structured payload read from stdin.
    Stdin {},

    /// A whole file stored as one string variable.
    FileSlurp { name: String, path: PathBuf },

    /// Every file matching a glob, keyed by path.
    FilesSlurp { glob: String },

    /// Environment entries with a name prefix (empty means all).
    Env {
        #[serde(default)]
        prefix: String,
    },
}

/// Path argument that selects stdin for `file_slurp`.
const STDIN_PATH: &str = "-";

impl VarsSource {
    pub fn new(kind: VarsSourceKind) -> Self {
        Self { key: None, kind }
    }

    /// Nests this source's batch under `key`.
    pub fn under(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn literal(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(VarsSourceKind::Literal {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(VarsSourceKind::File { path: path.into() })
    }

    pub fn stdin() -> Self {
        Self::new(VarsSourceKind::Stdin {})
    }

    pub fn file_slurp(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(VarsSourceKind::FileSlurp {
            name: name.into(),
            path: path.into(),
        })
    }

    pub fn files_slurp(glob: impl Into<String>) -> Self {
        Self::new(VarsSourceKind::FilesSlurp { glob: glob.into() })
    }

    pub fn env(prefix: impl Into<String>) -> Self {
        Self::new(VarsSourceKind::Env {
            prefix: prefix.into(),
        })
    }

    /// Loads this source's batch into `vars`.
    pub fn load(&self, vars: &mut Vars, host: &Host) -> Result<()> {
        let batch = self.kind.collect(host)?;
        vars.merge(self.key.as_deref(), batch);
        Ok(())
    }

    /// Short human-readable description, used in diagnostics.
    pub fn describe(&self) -> String {
        let what = match &self.kind {
            VarsSourceKind::Literal { key, .. } => format!("literal '{key}'"),
            VarsSourceKind::File { path } => format!("file {}", path.display()),
            VarsSourceKind::Stdin {} => "stdin".to_string(),
            VarsSourceKind::FileSlurp { name, path } => {
                format!("slurp '{name}' from {}", path.display())
            }
            VarsSourceKind::FilesSlurp { glob } => format!("slurp files '{glob}'"),
            VarsSourceKind::Env { prefix } => format!("environment '{prefix}*'"),
        };
        match &self.key {
            Some(key) if !key.is_empty() => format!("{what} under '{key}'"),
            _ => what,
        }
    }
}

impl VarsSourceKind {
    fn collect(&self, host: &Host) -> Result<Map> {
        let mut batch = Map::new();
        match self {
            VarsSourceKind::Literal { key, value } => {
                batch.insert(key.clone(), value.clone());
            }
            VarsSourceKind::File { path } => {
                let bytes = files::read(path)?;
                let (_, map) = decode::decode_from(&bytes, &files::path_name(path))?;
                batch = map;
            }
            VarsSourceKind::Stdin {} => {
                let bytes = read_stdin(host)?;
                let (_, map) = decode::decode_from(&bytes, "stdin")?;
                batch = map;
            }
            VarsSourceKind::FileSlurp { name, path } => {
                let content = if path == Path::new(STDIN_PATH) {
                    String::from_utf8_lossy(&read_stdin(host)?).into_owned()
                } else {
                    files::read_string(path)?
                };
                batch.insert(name.clone(), Value::String(content));
            }
            VarsSourceKind::FilesSlurp { glob } => {
                for path in files::expand(glob)? {
                    let content = files::read_string(&path)?;
                    batch.insert(files::path_name(&path), Value::String(content));
                }
            }
            VarsSourceKind::Env { prefix } => {
                for (name, value) in host.env().vars() {
                    if name.starts_with(prefix.as_str()) {
                        batch.insert(name, Value::String(value));
                    }
                }
            }
        }
        Ok(batch)
    }
}

fn read_stdin(host: &Host) -> Result<Vec<u8>> {
    host.stdin()
        .read_to_end()
        .map_err(|e| Error::io(STDIN_PATH, e))
}
