//! Error types for variable resolution and template rendering.
//!
//! This module provides [`Error`], the error type returned by every fallible
//! operation in the crate. It abstracts over the underlying decoders and the
//! template engine, and carries enough context (path, template name, source
//! index) to report a single-line diagnostic.
//!
//! [`FuncError`] is the narrower error raised by dynamic function dispatch
//! (`map`, `filter` and friends). Inside a template it travels as a
//! [`minijinja::Error`] and is recovered again when the render fails.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::decode::Format;

/// Error type for all engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No payload format accepted the input. Carries the last format tried.
    #[error("cannot decode {origin} as JSON, YAML or TOML: {source}")]
    Decode {
        /// Where the payload came from (a path or `stdin`)
        origin: String,
        /// The last format attempted
        format: Format,
        #[source]
        source: FormatError,
    },

    /// Unknown function name.
    #[error("no such function: '{name}'")]
    NotFound { name: String },

    /// A dynamically dispatched function reported a failure.
    #[error("calling '{name}' failed: {message}")]
    Invocation { name: String, message: String },

    /// Template text (or delimiter configuration) failed to compile.
    #[error("cannot compile template '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// Glob pattern is invalid.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Reading or writing a file, or reading stdin, failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Execution of a compiled template failed.
    #[error("cannot render template '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// Serializing variables or configuration failed in every output format.
    #[error("cannot serialize output: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// An error raised while loading the variable source at `index`.
    #[error("variable source #{index}: {source}")]
    VarsSource {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// An error raised while loading the template source at `index`.
    #[error("template source #{index} ('{name}'): {source}")]
    TemplateSource {
        index: usize,
        name: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn pattern(pattern: &str, source: glob::PatternError) -> Self {
        Error::Pattern {
            pattern: pattern.to_string(),
            source,
        }
    }

    /// Returns the underlying error with source-context wrappers removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::VarsSource { source, .. } | Error::TemplateSource { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    /// Classifies a template execution failure.
    ///
    /// Function-dispatch failures raised inside the template surface as
    /// [`Error::NotFound`] or [`Error::Invocation`]; everything else is an
    /// [`Error::Render`] for template `name`.
    pub(crate) fn from_render(name: &str, err: minijinja::Error) -> Self {
        if let Some(func_err) = find_func_error(&err) {
            return func_err.clone().into();
        }
        if err.kind() == minijinja::ErrorKind::UnknownFunction {
            let detail = err.detail().unwrap_or_default();
            return Error::NotFound {
                name: detail.strip_suffix(" is unknown").unwrap_or(detail).to_string(),
            };
        }
        Error::Render {
            name: name.to_string(),
            source: err,
        }
    }
}

fn find_func_error(err: &minijinja::Error) -> Option<&FuncError> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(err);
    while let Some(cause) = current {
        if let Some(func_err) = cause.downcast_ref::<FuncError>() {
            return Some(func_err);
        }
        current = cause.source();
    }
    None
}

/// Underlying failure of a single payload format.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("top-level value is not a mapping")]
    NotAMapping,
}

/// Errors raised by dynamic function dispatch.
#[derive(Debug, Clone, Error)]
pub enum FuncError {
    /// The named function is not in the registry.
    #[error("no such function: '{name}'")]
    NotFound { name: String },

    /// The function (or the dispatcher itself) rejected the call.
    #[error("calling '{name}' failed: {message}")]
    Invocation { name: String, message: String },
}

impl FuncError {
    pub(crate) fn invocation(name: &str, message: impl ToString) -> Self {
        FuncError::Invocation {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<FuncError> for Error {
    fn from(err: FuncError) -> Self {
        match err {
            FuncError::NotFound { name } => Error::NotFound { name },
            FuncError::Invocation { name, message } => Error::Invocation { name, message },
        }
    }
}

// Raised from inside a template: keep the FuncError as source so the
// renderer can classify the failure afterwards.
impl From<FuncError> for minijinja::Error {
    fn from(err: FuncError) -> Self {
        let kind = match err {
            FuncError::NotFound { .. } => minijinja::ErrorKind::UnknownFunction,
            FuncError::Invocation { .. } => minijinja::ErrorKind::InvalidOperation,
        };
        minijinja::Error::new(kind, err.to_string()).with_source(err)
    }
}
