//! Ready-made [`Project`](upstage_core::Project) implementations.

mod fs;
mod memory;

pub use fs::FsProject;
pub use memory::{Call, MemoryProject};
pub use upstage_core::{resolve_relative, Project, MANIFEST_PATH};
