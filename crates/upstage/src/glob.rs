//! Glob patterns over project-relative paths.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use upstage_core::MigrationError;

/// A compiled set of glob patterns matching when any member matches.
///
/// Patterns use `globset` syntax with `/` as a literal separator: `*` and `?`
/// stay within one segment, `**` spans segments, `[...]` and `{a,b}` are
/// supported and `\` escapes a metacharacter. A leading `./` is ignored.
#[derive(Debug, Clone)]
pub struct PathSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PathSet {
    /// Compiles every pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, MigrationError> {
        let mut builder = GlobSetBuilder::new();
        let mut sources = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = normalize(pattern.as_ref());
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .backslash_escape(true)
                .build()
                .map_err(|e| MigrationError::InvalidPattern(e.to_string()))?;
            builder.add(glob);
            sources.push(pattern.to_string());
        }
        let set = builder
            .build()
            .map_err(|e| MigrationError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            patterns: sources,
            set,
        })
    }

    /// Returns `true` if any pattern matches `path`.
    pub fn is_match(&self, path: &str) -> bool {
        self.set.is_match(normalize(path))
    }

    /// Patterns without metacharacters, naming a single file or directory.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.patterns
            .iter()
            .map(String::as_str)
            .filter(|pattern| !pattern.contains(['*', '?', '[', '{', '\\']))
    }

    /// Returns `true` if a pattern matches `path` or a literal pattern names
    /// one of its parent directories.
    pub fn covers(&self, path: &str) -> bool {
        let path = normalize(path);
        self.is_match(path)
            || self.literals().any(|dir| {
                path.strip_prefix(dir)
                    .is_some_and(|rest| rest.starts_with('/'))
            })
    }
}

fn normalize(path: &str) -> &str {
    let path = path.trim_start_matches("./");
    path.strip_suffix('/').unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_stays_in_segment() {
        let set = PathSet::new(&["test/*.js"]).unwrap();
        assert!(set.is_match("test/a.js"));
        assert!(!set.is_match("test/src/a.js"));
    }

    #[test]
    fn test_double_star() {
        let set = PathSet::new(&["test/src/**/*.js"]).unwrap();
        assert!(set.is_match("test/src/a.js"));
        assert!(set.is_match("test/src/deep/er/a.js"));
        assert!(!set.is_match("src/a.js"));

        let all = PathSet::new(&["lib/**"]).unwrap();
        assert!(all.is_match("lib/index.js"));
        assert!(all.is_match("lib/a/b.js"));
    }

    #[test]
    fn test_alternatives_and_classes() {
        let set = PathSet::new(&["{src,test}/**/*.[jt]s"]).unwrap();
        assert!(set.is_match("src/index.js"));
        assert!(set.is_match("test/a/b.ts"));
        assert!(!set.is_match("doc/index.js"));
    }

    #[test]
    fn test_escaped_metacharacters() {
        let set = PathSet::new(&[r"docs/\[draft\].md"]).unwrap();
        assert!(set.is_match("docs/[draft].md"));
        assert!(!set.is_match("docs/d.md"));
        assert_eq!(set.literals().count(), 0);
    }

    #[test]
    fn test_literal() {
        let set = PathSet::new(&["./.github/workflows/ci:test.yml"]).unwrap();
        assert_eq!(set.literals().collect::<Vec<_>>(), vec![".github/workflows/ci:test.yml"]);
        assert!(set.is_match(".github/workflows/ci:test.yml"));
        assert!(!set.is_match(".github/workflows/ci.yml"));
    }

    #[test]
    fn test_covers_literal_directories() {
        let set = PathSet::new(&["lib/", "*.md"]).unwrap();
        assert!(set.covers("lib/index.js"));
        assert!(set.covers("lib/a/b.js"));
        assert!(set.covers("README.md"));
        assert!(!set.covers("library/index.js"));
        assert!(!set.is_match("lib/index.js"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PathSet::new(&["src/[a"]).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidPattern(_)));
    }
}
