//! Single-step migration example on an in-memory project.

use async_trait::async_trait;
use upstage::prelude::*;
use upstage::project::MemoryProject;

struct XoConfig;

#[async_trait]
impl Migration for XoConfig {
    fn name(&self) -> StepName {
        StepName::new("xo:config")
    }

    fn description(&self) -> &str {
        "Configure xo."
    }

    fn commit(&self) -> Option<Commit> {
        Some(Commit::scoped("package.json", self.description()))
    }

    async fn precondition(&self, project: &dyn Project) -> Result<(), MigrationError> {
        let manifest = project.read_manifest().await?;
        ensure(manifest.get("xo").is_none(), "xo is not configured")
    }

    async fn postcondition(&self, project: &dyn Project) -> Result<(), MigrationError> {
        let manifest = project.read_manifest().await?;
        ensure(manifest.get("xo").is_some(), "xo is configured")
    }

    async fn apply(&self, project: &dyn Project) -> Result<(), MigrationError> {
        update(&ManifestFile::new(project), |mut manifest| {
            manifest["xo"] = serde_json::json!({
                "prettier": true,
                "plugins": ["unicorn"],
                "rules": {"unicorn/filename-case": "off"}
            });
            Ok(manifest)
        })
        .await?;
        project.fix_config().await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let runner = Runner::builder().add(XoConfig).build()?;
    let project = MemoryProject::new().with_file("package.json", r#"{"name": "demo"}"#);

    for attempt in 1..=2 {
        let report = runner.run(&project).await;
        println!("Run {}: {}", attempt, serde_json::to_string(&report)?);
    }

    if let Some(manifest) = project.file("package.json").await {
        println!("{}", manifest);
    }

    Ok(())
}
