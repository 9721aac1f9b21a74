//! Core traits and types for the upstage migration runner.
//!
//! This crate provides the contracts without any runtime. Catalog authors
//! depend on it to implement steps.
//!
//! # Core Types
//!
//! - [`Migration`] - A named step with precondition, apply and postcondition
//! - [`Project`] - The capabilities a step may use to inspect and edit a project
//! - [`MigrationError`] - Error types for catalog validation and step execution
//!
//! # Building Blocks
//!
//! - [`Update`] - Idempotent read, edit, write cycle over a [`Resource`]
//! - [`keyed`] - Order-preserving upserts into `[name, options]` arrays
//! - [`manifest`] - Dependency-table helpers for package manifests

mod error;
pub mod keyed;
pub mod manifest;
mod project;
mod step;
mod update;

pub use error::{ensure, MigrationError};
pub use project::{resolve_relative, Project, MANIFEST_PATH};
pub use step::{Commit, Group, Migration, StepName};
pub use update::{update, JsonFile, ManifestFile, Resource, TextFile, Update, UpdateOutcome};

/// Macro to define a step type with minimal boilerplate
///
/// This macro creates a unit struct with:
/// - `const NAME: &'static str` - the catalog name (defaults to the type name)
/// - `Debug` derive
/// - `Default` implementation
///
/// # Example
///
/// ```rust
/// use upstage_core::define_migration;
///
/// define_migration!(XoConfig, "xo:config");
/// assert_eq!(XoConfig::NAME, "xo:config");
///
/// define_migration!(Unnamed);
/// assert_eq!(Unnamed::NAME, "Unnamed");
/// ```
#[macro_export]
macro_rules! define_migration {
    ($name:ident) => {
        $crate::define_migration!($name, stringify!($name));
    };
    ($name:ident, $step:expr) => {
        #[derive(Debug)]
        pub struct $name;

        impl $name {
            /// Step name as a compile-time constant
            #[allow(dead_code)]
            pub const NAME: &'static str = $step;
        }

        impl Default for $name {
            fn default() -> Self {
                Self
            }
        }
    };
}
