//! Access to the process environment and stdin.
//!
//! `env` and `stdin` sources are the only parts of the engine that touch
//! process state. They reach it through a [`Host`], which holds one
//! [`EnvReader`] and one [`StdinReader`]:
//!
//! | Reader | Real | Mock |
//! |--------|------|------|
//! | environment | [`RealEnv`] (`std::env`) | [`MockEnv`] (ordered pairs) |
//! | stdin | [`RealStdin`] (locked `io::stdin`) | [`MockStdin`] (fixed bytes) |

use std::io::{self, Read};
use std::sync::Arc;

/// Source of the bytes piped into the process.
pub trait StdinReader: Send + Sync {
    fn read_to_end(&self) -> io::Result<Vec<u8>>;
}

/// Source of environment variables.
pub trait EnvReader: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;

    /// Every entry, in the order the process reports them.
    fn vars(&self) -> Vec<(String, String)>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealStdin;

impl StdinReader for RealStdin {
    fn read_to_end(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        io::stdin().lock().read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// The process environment. Entries that are not valid UTF-8 are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealEnv;

impl EnvReader for RealEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }
}

/// Stdin replacement returning the same bytes on every read.
#[derive(Debug, Clone, Default)]
pub struct MockStdin {
    bytes: Vec<u8>,
}

impl MockStdin {
    /// Nothing piped.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn piped(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl StdinReader for MockStdin {
    fn read_to_end(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Environment replacement. Entries keep insertion order; setting a name
/// again moves it to the end.
#[derive(Debug, Clone, Default)]
pub struct MockEnv {
    entries: Vec<(String, String)>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, value.into()));
        self
    }
}

impl EnvReader for MockEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.entries
            .iter()
            .find_map(|(existing, value)| (existing == name).then(|| value.clone()))
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.entries.clone()
    }
}

/// The environment and stdin that sources load against.
#[derive(Clone)]
pub struct Host {
    env: Arc<dyn EnvReader>,
    stdin: Arc<dyn StdinReader>,
}

impl Host {
    /// The running process.
    pub fn real() -> Self {
        Self::with_readers(RealEnv, RealStdin)
    }

    pub fn with_readers(env: impl EnvReader + 'static, stdin: impl StdinReader + 'static) -> Self {
        Self {
            env: Arc::new(env),
            stdin: Arc::new(stdin),
        }
    }

    pub fn env(&self) -> &dyn EnvReader {
        &*self.env
    }

    pub fn stdin(&self) -> &dyn StdinReader {
        &*self.stdin
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::real()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
