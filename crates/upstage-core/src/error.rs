//! Migration error types.

use crate::step::StepName;
use thiserror::Error;

/// Errors raised while validating a catalog or driving a step.
///
/// Catalog errors ([`UnresolvedDependency`](MigrationError::UnresolvedDependency),
/// [`CyclicDependency`](MigrationError::CyclicDependency),
/// [`DuplicateStep`](MigrationError::DuplicateStep),
/// [`UnknownStep`](MigrationError::UnknownStep)) are reported before any step
/// touches the project. Everything else surfaces from inside a step.
///
/// # Non-Exhaustive
///
/// Always include a wildcard arm when matching:
///
/// ```
/// use upstage_core::MigrationError;
///
/// fn explain(error: &MigrationError) -> String {
///     match error {
///         MigrationError::Assertion { message } => format!("unexpected state: {message}"),
///         MigrationError::CyclicDependency { cycle } => format!("cycle: {cycle:?}"),
///         other => other.to_string(),
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MigrationError {
    /// A precondition or postcondition expectation was not met.
    #[error("Assertion failed: {message}")]
    Assertion {
        /// What was expected
        message: String,
    },

    /// `update` was asked to edit an artifact that does not exist and may not be created.
    #[error("Missing resource: {resource}")]
    MissingResource {
        /// The artifact that was expected to exist
        resource: String,
    },

    /// The read capability found nothing at the given path.
    #[error("Not found: {path}")]
    NotFound {
        /// Project-relative path
        path: String,
    },

    /// A step names a dependency that is not registered.
    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    UnresolvedDependency {
        /// The step declaring the dependency
        step: StepName,
        /// The missing dependency
        dependency: StepName,
    },

    /// The dependency graph contains a cycle.
    #[error("Dependency cycle: {}", format_cycle(.cycle))]
    CyclicDependency {
        /// Steps along the cycle, first step repeated at the end
        cycle: Vec<StepName>,
    },

    /// Two steps were registered under the same name.
    #[error("Duplicate step: {0}")]
    DuplicateStep(StepName),

    /// A run target does not name a registered step.
    #[error("Unknown step: {0}")]
    UnknownStep(StepName),

    /// A file could not be turned into a syntax tree.
    #[error("Failed to parse {path}: {message}")]
    ParseFailure {
        /// Project-relative path
        path: String,
        /// Why parsing failed
        message: String,
    },

    /// The storage capability rejected a write.
    #[error("Failed to write {path}: {details}")]
    WriteFailure {
        /// Project-relative path
        path: String,
        /// Details about the failure
        details: String,
    },

    /// A textual pattern could not be compiled.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// An I/O error other than a missing file or a rejected write.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Project-relative path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A JSON artifact could not be decoded or encoded.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// Project-relative path
        path: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// An injected capability failed or is not provided.
    #[error("Capability '{capability}' failed: {details}")]
    Capability {
        /// Capability name, e.g. `install`
        capability: String,
        /// Details about the failure
        details: String,
    },
}

impl MigrationError {
    /// Creates an [`Assertion`](MigrationError::Assertion) error.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    /// Creates a [`Capability`](MigrationError::Capability) error.
    pub fn capability(capability: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Capability {
            capability: capability.into(),
            details: details.into(),
        }
    }

    /// Returns `true` when a read reported the artifact as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for errors caused by the catalog rather than the project.
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedDependency { .. }
                | Self::CyclicDependency { .. }
                | Self::DuplicateStep(_)
                | Self::UnknownStep(_)
        )
    }
}

fn format_cycle(cycle: &[StepName]) -> String {
    cycle
        .iter()
        .map(StepName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Fails with [`MigrationError::Assertion`] when `condition` is false.
///
/// This is how steps express the `assert` capability:
///
/// ```
/// use upstage_core::ensure;
///
/// assert!(ensure(1 + 1 == 2, "arithmetic").is_ok());
/// assert!(ensure(false, "xo config is present").is_err());
/// ```
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), MigrationError> {
    if condition {
        Ok(())
    } else {
        Err(MigrationError::assertion(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = MigrationError::assertion("flag is absent");
        assert_eq!(error.to_string(), "Assertion failed: flag is absent");

        let error = MigrationError::UnresolvedDependency {
            step: StepName::new("xo:config"),
            dependency: StepName::new("deps:add-xo"),
        };
        assert_eq!(
            error.to_string(),
            "Step 'xo:config' depends on unknown step 'deps:add-xo'"
        );
    }

    #[test]
    fn test_cycle_display() {
        let error = MigrationError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(error.to_string(), "Dependency cycle: a -> b -> a");
        assert!(error.is_catalog_error());
    }

    #[test]
    fn test_ensure() {
        assert!(ensure(true, "ok").is_ok());
        match ensure(false, "manifest has flag") {
            Err(MigrationError::Assertion { message }) => assert_eq!(message, "manifest has flag"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_not_found_classification() {
        let error = MigrationError::NotFound {
            path: "README.md".to_string(),
        };
        assert!(error.is_not_found());
        assert!(!error.is_catalog_error());
    }
}
