//! Dependency-ordered, idempotent project migrations.
//!
//! A catalog of [`Migration`] steps is validated and ordered by [`Runner`],
//! then each step is driven through its postcondition/precondition/apply
//! contract against a [`Project`]. Steps edit artifacts with the update
//! primitive ([`update`], [`Update`]), the textual engine ([`text`]), the
//! structural engine ([`code`]) and the keyed array helpers ([`keyed`]).
//!
//! # Example
//!
//! ```rust
//! use upstage::prelude::*;
//! use upstage::project::MemoryProject;
//! use async_trait::async_trait;
//!
//! struct SetFlag;
//!
//! #[async_trait]
//! impl Migration for SetFlag {
//!     fn name(&self) -> StepName {
//!         StepName::new("package.json:set-flag")
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Set the flag."
//!     }
//!
//!     async fn precondition(&self, project: &dyn Project) -> Result<(), MigrationError> {
//!         let manifest = project.read_manifest().await?;
//!         ensure(manifest.get("flag").is_none(), "flag is absent")
//!     }
//!
//!     async fn postcondition(&self, project: &dyn Project) -> Result<(), MigrationError> {
//!         let manifest = project.read_manifest().await?;
//!         ensure(manifest["flag"] == true, "flag is set")
//!     }
//!
//!     async fn apply(&self, project: &dyn Project) -> Result<(), MigrationError> {
//!         let mut manifest = project.read_manifest().await?;
//!         manifest["flag"] = true.into();
//!         project.write_manifest(&manifest).await
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = Runner::builder().add(SetFlag).build().expect("valid catalog");
//!     let project = MemoryProject::new().with_file("package.json", "{}");
//!
//!     let report = runner.run(&project).await;
//!     assert_eq!(report.status_of("package.json:set-flag"), Some(&StepStatus::Applied));
//! }
//! ```

pub mod code;
mod config;
pub mod glob;
mod graph;
pub mod project;
mod runner;
pub mod text;

// Re-export core types
pub use upstage_core::*;

pub use config::RunnerConfig;
pub use runner::{run, RunReport, Runner, RunnerBuilder, StepOutcome, StepStatus};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ensure, update, Commit, Group, JsonFile, ManifestFile, Migration, MigrationError, Project,
        RunReport, Runner, RunnerBuilder, RunnerConfig, StepName, StepStatus, TextFile, Update,
        UpdateOutcome,
    };
}
