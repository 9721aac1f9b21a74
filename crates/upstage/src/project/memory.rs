use crate::glob::PathSet;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;
use upstage_core::{MigrationError, Project};

/// A capability invocation recorded by [`MemoryProject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `read(path)`
    Read(String),
    /// `write(path, ..)`
    Write(String),
    /// `remove(patterns)`
    Remove(Vec<String>),
    /// `exists(path)`
    Exists(String),
    /// `glob(patterns)`
    Glob(Vec<String>),
    /// `install()`
    Install,
    /// `upgrade(packages)`
    Upgrade(Vec<String>),
    /// `fix_config()`
    FixConfig,
    /// `fix_sources()`
    FixSources,
    /// `fix_manifest()`
    FixManifest,
}

/// A project held entirely in memory.
///
/// Every capability call is recorded, which makes it the natural fixture for
/// testing steps and engines. Package-manager operations succeed without
/// doing anything.
///
/// ```
/// use upstage::project::MemoryProject;
/// use upstage_core::Project;
///
/// # #[tokio::main]
/// # async fn main() {
/// let project = MemoryProject::new().with_file("package.json", r#"{"name": "demo"}"#);
/// let manifest = project.read_manifest().await.unwrap();
/// assert_eq!(manifest["name"], "demo");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryProject {
    files: Mutex<BTreeMap<String, String>>,
    read_only: BTreeSet<String>,
    calls: Mutex<Vec<Call>>,
}

fn normalize(path: &str) -> String {
    path.trim_start_matches("./").to_string()
}

impl MemoryProject {
    /// Creates an empty project.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file.
    pub fn with_file(mut self, path: impl AsRef<str>, contents: impl Into<String>) -> Self {
        self.files
            .get_mut()
            .insert(normalize(path.as_ref()), contents.into());
        self
    }

    /// Makes writes to `path` fail with [`MigrationError::WriteFailure`].
    pub fn with_read_only(mut self, path: impl AsRef<str>) -> Self {
        self.read_only.insert(normalize(path.as_ref()));
        self
    }

    /// Returns the current contents of a file.
    pub async fn file(&self, path: &str) -> Option<String> {
        self.files.lock().await.get(&normalize(path)).cloned()
    }

    /// Returns all file paths, sorted.
    pub async fn paths(&self) -> Vec<String> {
        self.files.lock().await.keys().cloned().collect()
    }

    /// Returns the recorded calls in order.
    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    /// Forgets the recorded calls.
    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl Project for MemoryProject {
    async fn read(&self, path: &str) -> Result<String, MigrationError> {
        self.record(Call::Read(path.to_string())).await;
        self.file(path).await.ok_or_else(|| MigrationError::NotFound {
            path: path.to_string(),
        })
    }

    async fn write(&self, path: &str, contents: &str) -> Result<(), MigrationError> {
        self.record(Call::Write(path.to_string())).await;
        let key = normalize(path);
        if self.read_only.contains(&key) {
            return Err(MigrationError::WriteFailure {
                path: path.to_string(),
                details: "file is read-only".to_string(),
            });
        }
        self.files.lock().await.insert(key, contents.to_string());
        Ok(())
    }

    /// Drops every file a pattern matches or a literal pattern names a parent
    /// directory of.
    async fn remove(&self, patterns: &[&str]) -> Result<(), MigrationError> {
        self.record(Call::Remove(patterns.iter().map(|p| p.to_string()).collect()))
            .await;
        let paths = PathSet::new(patterns)?;
        self.files.lock().await.retain(|path, _| !paths.covers(path));
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, MigrationError> {
        self.record(Call::Exists(path.to_string())).await;
        Ok(self.files.lock().await.contains_key(&normalize(path)))
    }

    async fn glob(&self, patterns: &[&str]) -> Result<Vec<String>, MigrationError> {
        self.record(Call::Glob(patterns.iter().map(|p| p.to_string()).collect()))
            .await;
        let paths = PathSet::new(patterns)?;
        Ok(self
            .files
            .lock()
            .await
            .keys()
            .filter(|path| paths.is_match(path))
            .cloned()
            .collect())
    }

    async fn install(&self) -> Result<(), MigrationError> {
        self.record(Call::Install).await;
        Ok(())
    }

    async fn upgrade(&self, packages: &[&str]) -> Result<(), MigrationError> {
        self.record(Call::Upgrade(packages.iter().map(|p| p.to_string()).collect()))
            .await;
        Ok(())
    }

    async fn fix_config(&self) -> Result<(), MigrationError> {
        self.record(Call::FixConfig).await;
        Ok(())
    }

    async fn fix_sources(&self) -> Result<(), MigrationError> {
        self.record(Call::FixSources).await;
        Ok(())
    }

    async fn fix_manifest(&self) -> Result<(), MigrationError> {
        self.record(Call::FixManifest).await;
        Ok(())
    }
}
