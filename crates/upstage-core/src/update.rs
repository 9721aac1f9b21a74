//! The read, edit, write cycle every mutating step is built on.

use crate::error::MigrationError;
use crate::project::{Project, MANIFEST_PATH};
use async_trait::async_trait;
use serde_json::Value;

/// An artifact that can be read whole and written whole.
///
/// `read` must fail with [`MigrationError::NotFound`] when the artifact does
/// not exist; any other error aborts the update.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The in-memory form of the artifact.
    type Value: Send;

    /// Human-readable identifier used in errors.
    fn describe(&self) -> String;

    /// Reads the current value.
    async fn read(&self) -> Result<Self::Value, MigrationError>;

    /// Replaces the stored value.
    async fn write(&self, value: Self::Value) -> Result<(), MigrationError>;
}

/// What [`Update::edit`] did to the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The artifact was absent and has been created.
    Created,
    /// The artifact existed and has been rewritten.
    Overwritten,
    /// The artifact existed and was left untouched.
    Kept,
}

/// Idempotent update of a single artifact.
///
/// Defaults to `create = false` and `overwrite = true`:
///
/// | artifact | `create` | `overwrite` | effect |
/// |----------|----------|-------------|--------|
/// | absent   | false    | any         | [`MigrationError::MissingResource`] |
/// | absent   | true     | any         | `write(edit(None))` |
/// | present  | any      | false       | nothing |
/// | present  | any      | true        | `write(edit(Some(current)))` |
///
/// The write happens even when `edit` returns the value it was given.
///
/// # Examples
///
/// ```no_run
/// use upstage_core::{MigrationError, Project, TextFile, Update};
///
/// async fn seed_loader(project: &dyn Project) -> Result<(), MigrationError> {
///     Update::new(&TextFile::new(project, "test/loader/config.js"))
///         .create(true)
///         .overwrite(false)
///         .edit(|_| Ok("export default {};\n".to_string()))
///         .await?;
///     Ok(())
/// }
/// ```
pub struct Update<'r, R: ?Sized> {
    resource: &'r R,
    create: bool,
    overwrite: bool,
}

impl<'r, R: Resource + ?Sized> Update<'r, R> {
    /// Creates an update with the default policy.
    pub fn new(resource: &'r R) -> Self {
        Self {
            resource,
            create: false,
            overwrite: true,
        }
    }

    /// Allows creating the artifact when it is absent.
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Allows rewriting the artifact when it is present.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Runs the cycle with the given edit function.
    pub async fn edit<F>(self, edit: F) -> Result<UpdateOutcome, MigrationError>
    where
        F: FnOnce(Option<R::Value>) -> Result<R::Value, MigrationError> + Send,
    {
        match self.resource.read().await {
            Ok(current) => {
                if !self.overwrite {
                    tracing::debug!("Keeping existing {}", self.resource.describe());
                    return Ok(UpdateOutcome::Kept);
                }
                let next = edit(Some(current))?;
                self.resource.write(next).await?;
                Ok(UpdateOutcome::Overwritten)
            }
            Err(error) if error.is_not_found() => {
                if !self.create {
                    return Err(MigrationError::MissingResource {
                        resource: self.resource.describe(),
                    });
                }
                let next = edit(None)?;
                self.resource.write(next).await?;
                tracing::debug!("Created {}", self.resource.describe());
                Ok(UpdateOutcome::Created)
            }
            Err(error) => Err(error),
        }
    }
}

/// Shorthand for [`Update::new`] with the default policy and an edit that
/// requires the artifact to exist.
pub async fn update<R, F>(resource: &R, edit: F) -> Result<(), MigrationError>
where
    R: Resource + ?Sized,
    F: FnOnce(R::Value) -> Result<R::Value, MigrationError> + Send,
{
    let describe = resource.describe();
    Update::new(resource)
        .edit(move |current| match current {
            Some(value) => edit(value),
            None => Err(MigrationError::MissingResource { resource: describe }),
        })
        .await
        .map(|_| ())
}

/// A text file inside a project.
pub struct TextFile<'p> {
    project: &'p dyn Project,
    path: String,
}

impl<'p> TextFile<'p> {
    /// Wraps `path` in `project`.
    pub fn new(project: &'p dyn Project, path: impl Into<String>) -> Self {
        Self {
            project,
            path: path.into(),
        }
    }
}

#[async_trait]
impl Resource for TextFile<'_> {
    type Value = String;

    fn describe(&self) -> String {
        self.path.clone()
    }

    async fn read(&self) -> Result<String, MigrationError> {
        self.project.read(&self.path).await
    }

    async fn write(&self, value: String) -> Result<(), MigrationError> {
        self.project.write(&self.path, &value).await
    }
}

/// A JSON file inside a project.
pub struct JsonFile<'p> {
    project: &'p dyn Project,
    path: String,
}

impl<'p> JsonFile<'p> {
    /// Wraps `path` in `project`.
    pub fn new(project: &'p dyn Project, path: impl Into<String>) -> Self {
        Self {
            project,
            path: path.into(),
        }
    }
}

#[async_trait]
impl Resource for JsonFile<'_> {
    type Value = Value;

    fn describe(&self) -> String {
        self.path.clone()
    }

    async fn read(&self) -> Result<Value, MigrationError> {
        self.project.read_json(&self.path).await
    }

    async fn write(&self, value: Value) -> Result<(), MigrationError> {
        self.project.write_json(&self.path, &value).await
    }
}

/// The package manifest of a project.
pub struct ManifestFile<'p> {
    project: &'p dyn Project,
}

impl<'p> ManifestFile<'p> {
    /// Wraps the manifest of `project`.
    pub fn new(project: &'p dyn Project) -> Self {
        Self { project }
    }
}

#[async_trait]
impl Resource for ManifestFile<'_> {
    type Value = Value;

    fn describe(&self) -> String {
        MANIFEST_PATH.to_string()
    }

    async fn read(&self) -> Result<Value, MigrationError> {
        self.project.read_manifest().await
    }

    async fn write(&self, value: Value) -> Result<(), MigrationError> {
        self.project.write_manifest(&value).await
    }
}
