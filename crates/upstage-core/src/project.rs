//! The capability surface steps use to read and mutate a project.

use crate::error::MigrationError;
use async_trait::async_trait;
use serde_json::Value;

/// Path of the package manifest, relative to the project root.
pub const MANIFEST_PATH: &str = "package.json";

/// Capabilities injected into every step.
///
/// One value is created per run and passed by reference to each step; the
/// core never performs I/O on its own. Paths are project-relative and use `/`
/// as separator.
///
/// Only the file primitives are required. JSON and manifest access are built
/// on top of `read`/`write`, path resolution is lexical, and the formatting
/// hooks do nothing unless overridden. Package-manager operations fail with
/// [`MigrationError::Capability`] unless the implementation provides them.
#[async_trait]
pub trait Project: Send + Sync {
    /// Reads a text file. Fails with [`MigrationError::NotFound`] when absent.
    async fn read(&self, path: &str) -> Result<String, MigrationError>;

    /// Writes a text file, creating parent directories as needed.
    async fn write(&self, path: &str, contents: &str) -> Result<(), MigrationError>;

    /// Removes every file matching one of the glob patterns.
    async fn remove(&self, patterns: &[&str]) -> Result<(), MigrationError>;

    /// Returns `true` if a file exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, MigrationError>;

    /// Lists files matching any of the glob patterns, sorted.
    async fn glob(&self, patterns: &[&str]) -> Result<Vec<String>, MigrationError>;

    /// Reads and decodes a JSON file.
    async fn read_json(&self, path: &str) -> Result<Value, MigrationError> {
        let text = self.read(path).await?;
        serde_json::from_str(&text).map_err(|source| MigrationError::Json {
            path: path.to_string(),
            source,
        })
    }

    /// Encodes and writes a JSON file with two-space indentation and a trailing newline.
    async fn write_json(&self, path: &str, value: &Value) -> Result<(), MigrationError> {
        let mut text = serde_json::to_string_pretty(value).map_err(|source| MigrationError::Json {
            path: path.to_string(),
            source,
        })?;
        text.push('\n');
        self.write(path, &text).await
    }

    /// Reads the package manifest.
    async fn read_manifest(&self) -> Result<Value, MigrationError> {
        self.read_json(MANIFEST_PATH).await
    }

    /// Writes the package manifest.
    async fn write_manifest(&self, manifest: &Value) -> Result<(), MigrationError> {
        self.write_json(MANIFEST_PATH, manifest).await
    }

    /// Installs the dependencies declared in the manifest.
    async fn install(&self) -> Result<(), MigrationError> {
        Err(MigrationError::capability("install", "not provided by this project"))
    }

    /// Upgrades the named packages to their latest versions.
    async fn upgrade(&self, packages: &[&str]) -> Result<(), MigrationError> {
        Err(MigrationError::capability(
            "upgrade",
            format!("not provided by this project ({})", packages.join(", ")),
        ))
    }

    /// Normalizes configuration files after raw edits.
    async fn fix_config(&self) -> Result<(), MigrationError> {
        Ok(())
    }

    /// Normalizes source files after raw edits.
    async fn fix_sources(&self) -> Result<(), MigrationError> {
        Ok(())
    }

    /// Normalizes the manifest after raw edits.
    async fn fix_manifest(&self) -> Result<(), MigrationError> {
        Ok(())
    }

    /// Resolves `relative` against the directory of `from`.
    ///
    /// The result is project-relative and always starts with `./`, so
    /// `resolve_from_file("test/src/api.js", "../../src/index.js")` is
    /// `./src/index.js`.
    fn resolve_from_file(&self, from: &str, relative: &str) -> String {
        resolve_relative(from, relative)
    }

    /// Maps an import specifier to what the module loader would use.
    ///
    /// Defaults to the specifier itself.
    fn resolve_require(&self, _from: &str, specifier: &str) -> String {
        specifier.to_string()
    }

    /// Emits a debug message.
    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }
}

/// Lexically joins `relative` onto the directory of `from`.
pub fn resolve_relative(from: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = from.split('/').collect();
    parts.pop();
    parts.retain(|part| !part.is_empty() && *part != ".");
    if relative.starts_with('/') {
        parts.clear();
    }
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    if parts.first() == Some(&"..") {
        parts.join("/")
    } else {
        format!("./{}", parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_relative("test/src/api.js", "../../src/index.js"),
            "./src/index.js"
        );
        assert_eq!(resolve_relative("index.js", "./lib/a.js"), "./lib/a.js");
        assert_eq!(resolve_relative("./test/a.js", "./b.js"), "./test/b.js");
        assert_eq!(resolve_relative("a.js", "../outside.js"), "../outside.js");
    }
}
