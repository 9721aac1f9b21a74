//! Runner configuration.

use serde::{Deserialize, Serialize};
use upstage_core::StepName;

/// Options controlling a [`Runner`](crate::Runner).
///
/// ```
/// use upstage::RunnerConfig;
///
/// let config: RunnerConfig = serde_json::from_str(r#"{"targets": ["xo:config"]}"#).unwrap();
/// assert!(!config.dry_run);
/// assert_eq!(config.targets.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Evaluate conditions but never call `apply`.
    #[serde(default)]
    pub dry_run: bool,
    /// Restrict the run to these steps and their transitive dependencies.
    /// Empty means the whole catalog.
    #[serde(default)]
    pub targets: Vec<StepName>,
}

impl RunnerConfig {
    /// Configuration for a dry run.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Adds a target step.
    pub fn with_target(mut self, target: impl Into<StepName>) -> Self {
        self.targets.push(target.into());
        self
    }
}
