//! Migration step trait and related types.

use crate::error::MigrationError;
use crate::project::Project;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe step name wrapper.
///
/// Step names follow the `area:action` convention, e.g. `xo:config`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a StepName from a type's name (extracts last segment).
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let short_name = full_name.rsplit("::").next().unwrap_or("UnknownStep");
        Self::new(short_name)
    }

    /// Returns the step name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for StepName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Classification of the change a step produces, for commit and changelog generation.
///
/// # Examples
///
/// ```
/// use upstage_core::Commit;
///
/// let commit = Commit::new("config", "Setup development environment.").with_scope("babel");
/// assert_eq!(commit.header(), "config(babel): Setup development environment.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Change type, e.g. `build`, `deps`, `config`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Optional scope, e.g. `package.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// One-line subject
    pub subject: String,
}

impl Commit {
    /// Creates a commit with a type and a subject.
    pub fn new(kind: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            scope: None,
            subject: subject.into(),
        }
    }

    /// Creates a commit that only carries a scope, as some catalog entries do.
    pub fn scoped(scope: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            kind: None,
            scope: Some(scope.into()),
            subject: subject.into(),
        }
    }

    /// Sets the scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Renders a conventional commit header: `type(scope): subject`.
    pub fn header(&self) -> String {
        let kind = self.kind.as_deref().unwrap_or("chore");
        match &self.scope {
            Some(scope) => format!("{kind}({scope}): {}", self.subject),
            None => format!("{kind}: {}", self.subject),
        }
    }
}

/// A named, idempotent unit of project migration.
///
/// The runner drives every step through the same contract:
///
/// 1. `postcondition` succeeds: the effects are already present, nothing to do.
/// 2. otherwise `precondition` must succeed, or the run stops.
/// 3. `apply` mutates the project, then `postcondition` must succeed.
///
/// Conditions express expectations with [`ensure`](crate::ensure) and any
/// error counts as "not met".
///
/// # Examples
///
/// ```
/// use upstage_core::{ensure, Migration, MigrationError, Project, StepName};
/// use async_trait::async_trait;
///
/// struct SetFlag;
///
/// #[async_trait]
/// impl Migration for SetFlag {
///     fn name(&self) -> StepName {
///         StepName::new("package.json:set-flag")
///     }
///
///     fn description(&self) -> &str {
///         "Set the flag."
///     }
///
///     async fn precondition(&self, project: &dyn Project) -> Result<(), MigrationError> {
///         let manifest = project.read_manifest().await?;
///         ensure(manifest.get("flag").is_none(), "flag is absent")
///     }
///
///     async fn postcondition(&self, project: &dyn Project) -> Result<(), MigrationError> {
///         let manifest = project.read_manifest().await?;
///         ensure(manifest["flag"] == true, "flag is set")
///     }
///
///     async fn apply(&self, project: &dyn Project) -> Result<(), MigrationError> {
///         let mut manifest = project.read_manifest().await?;
///         manifest["flag"] = true.into();
///         project.write_manifest(&manifest).await
///     }
/// }
/// ```
#[async_trait]
pub trait Migration: Send + Sync {
    /// Returns the unique step name.
    ///
    /// By default, uses the type name. Catalog steps override it.
    fn name(&self) -> StepName {
        StepName::from_type_name::<Self>()
    }

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Commit metadata for the change this step produces.
    fn commit(&self) -> Option<Commit> {
        None
    }

    /// Steps that must be applied before this one, in declaration order.
    fn dependencies(&self) -> Vec<StepName> {
        Vec::new()
    }

    /// Asserts the project is in the state this step expects.
    async fn precondition(&self, project: &dyn Project) -> Result<(), MigrationError>;

    /// Asserts the project is in the state this step guarantees.
    async fn postcondition(&self, project: &dyn Project) -> Result<(), MigrationError>;

    /// Mutates the project toward the postcondition.
    async fn apply(&self, project: &dyn Project) -> Result<(), MigrationError>;

    /// Formats step information for debugging.
    fn fmt_debug(&self) -> String {
        format!(
            "Step '{}' (dependencies: {:?})",
            self.name(),
            self.dependencies()
        )
    }
}

/// A step that only groups prerequisites.
///
/// Its conditions always hold, so once its dependencies ran it reports
/// `already-applied`.
///
/// ```
/// use upstage_core::{Group, Migration};
///
/// let group = Group::new(
///     "package.json:configure-source-linting",
///     "Setup linting for source files.",
///     ["deps:add-xo", "xo:config"],
/// );
/// assert_eq!(group.dependencies().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Group {
    name: StepName,
    description: String,
    dependencies: Vec<StepName>,
}

impl Group {
    /// Creates a group step.
    pub fn new<I, S>(name: impl Into<StepName>, description: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StepName>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Migration for Group {
    fn name(&self) -> StepName {
        self.name.clone()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn dependencies(&self) -> Vec<StepName> {
        self.dependencies.clone()
    }

    async fn precondition(&self, _project: &dyn Project) -> Result<(), MigrationError> {
        Ok(())
    }

    async fn postcondition(&self, _project: &dyn Project) -> Result<(), MigrationError> {
        Ok(())
    }

    async fn apply(&self, _project: &dyn Project) -> Result<(), MigrationError> {
        Ok(())
    }
}
