//! File reading and glob helpers shared by variable and template sources.
//!
//! Globs use shell syntax with `/` (the path separator) as a segment
//! boundary: `*` never crosses directories, `**` does.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{Error, Result};

/// Matching rules for every glob in the crate.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Expands a glob against the filesystem, in sorted path order.
pub(crate) fn expand(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob_with(pattern, MATCH_OPTIONS).map_err(|e| Error::pattern(pattern, e))?;
    paths
        .map(|entry| entry.map_err(|e| Error::io(e.path().to_path_buf(), e.into_error())))
        .collect()
}

/// Compiles a glob for matching names (template names, slurped paths).
pub fn compile_pattern(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| Error::pattern(pattern, e))
}

/// Checks a name against a compiled glob.
pub fn matches(pattern: &Pattern, name: &str) -> bool {
    pattern.matches_with(name, MATCH_OPTIONS)
}

pub(crate) fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::io(path, e))
}

/// Reads a file as text. Invalid UTF-8 sequences are replaced.
pub(crate) fn read_string(path: &Path) -> Result<String> {
    Ok(String::from_utf8_lossy(&read(path)?).into_owned())
}

/// Display form of a path, used as a variable key or template name.
pub(crate) fn path_name(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_star_does_not_cross_separator() {
        let pattern = compile_pattern("tmpl/*.txt").unwrap();
        assert!(matches(&pattern, "tmpl/a.txt"));
        assert!(!matches(&pattern, "tmpl/sub/a.txt"));

        let deep = compile_pattern("tmpl/**/*.txt").unwrap();
        assert!(matches(&deep, "tmpl/sub/a.txt"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = compile_pattern("a[").unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn test_expand_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("c.md"), "c").unwrap();

        let pattern = format!("{}/*.txt", dir.path().display());
        let paths = expand(&pattern).unwrap();
        assert_eq!(
            paths,
            vec![dir.path().join("a.txt"), dir.path().join("b.txt")]
        );
    }

    #[test]
    fn test_read_missing_file() {
        let err = read(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
