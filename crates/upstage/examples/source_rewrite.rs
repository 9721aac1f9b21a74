//! Rewrites test imports in a project directory.
//!
//! Usage: `cargo run --example source_rewrite -- <project-dir> [--apply]`
//!
//! Without `--apply` the run is a dry run: conditions are evaluated and the
//! report lists what would change.

use async_trait::async_trait;
use std::env;
use upstage::code::{self, Pattern, PrintOptions};
use upstage::prelude::*;
use upstage::project::FsProject;

const TEST_SOURCES: &str = "test/src/**/*.js";
const PLACEHOLDER_MODULE: &str = "#module";

fn source_imports() -> Pattern {
    Pattern::new(|node| {
        node.is("string")
            && node
                .parent()
                .is_some_and(|parent| parent.is("import_statement") || parent.is("export_statement"))
            && node.string_value().is_some_and(|value| {
                value.starts_with('.') && upstage::resolve_relative(node.path(), value) == "./src/index.js"
            })
    })
    .map(|node| node.literal(PLACEHOLDER_MODULE))
}

struct ImportMapTests;

#[async_trait]
impl Migration for ImportMapTests {
    fn name(&self) -> StepName {
        StepName::new("ava:import-map-tests")
    }

    fn description(&self) -> &str {
        "Import the tested module through an import map."
    }

    fn commit(&self) -> Option<Commit> {
        Some(Commit::new("test", self.description()))
    }

    async fn precondition(&self, project: &dyn Project) -> Result<(), MigrationError> {
        let sources = project.glob(&[TEST_SOURCES]).await?;
        ensure(
            code::find(&[&source_imports()], &sources, project).await?,
            "tests import ./src/index.js relatively",
        )
    }

    async fn postcondition(&self, project: &dyn Project) -> Result<(), MigrationError> {
        let sources = project.glob(&[TEST_SOURCES]).await?;
        ensure(
            !code::find(&[&source_imports()], &sources, project).await?,
            "no relative imports of ./src/index.js are left",
        )
    }

    async fn apply(&self, project: &dyn Project) -> Result<(), MigrationError> {
        Update::new(&JsonFile::new(project, "test/import-maps/src/index.json"))
            .create(true)
            .overwrite(false)
            .edit(|_| Ok(serde_json::json!({"imports": {PLACEHOLDER_MODULE: "./src/index.js"}})))
            .await?;
        let sources = project.glob(&[TEST_SOURCES]).await?;
        let changed = code::replace(&[&source_imports()], &sources, project, &PrintOptions::single_quotes()).await?;
        project.debug(&format!("rewrote {changed} test file(s)"));
        project.fix_sources().await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let root = args.next().unwrap_or_else(|| ".".to_string());
    let config = if args.any(|arg| arg == "--apply") {
        RunnerConfig::default()
    } else {
        RunnerConfig::dry_run()
    };

    let runner = Runner::builder().add(ImportMapTests).config(config).build()?;
    let report = runner.run(&FsProject::new(root)).await;

    for (step, status) in report.statuses() {
        println!("{step}: {status}");
    }
    for (step, commit) in report.commits() {
        println!("{step} -> {}", commit.header());
    }

    if report.is_success() {
        Ok(())
    } else {
        Err("migration stopped".into())
    }
}
