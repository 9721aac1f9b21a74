//! Migration runner driving steps through their precondition/apply/postcondition contract.

use crate::config::RunnerConfig;
use crate::graph::DependencyGraph;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};
use upstage_core::{Commit, Migration, MigrationError, Project, StepName};

/// What happened to a step during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
#[non_exhaustive]
pub enum StepStatus {
    /// The postcondition held before anything ran.
    AlreadyApplied,
    /// `apply` ran and the postcondition holds afterwards.
    Applied,
    /// Dry run: the step would have been applied.
    WouldApply,
    /// Dry run: a dependency would have been applied first, so this step's
    /// conditions were not evaluated against the unchanged project.
    PendingDependency {
        /// The first dependency still waiting to be applied.
        dependency: StepName,
    },
    /// The precondition failed. The run stopped here.
    UnmetPrecondition {
        /// The precondition error.
        reason: String,
    },
    /// `apply` returned an error. The run stopped here.
    ApplyFailed {
        /// The error `apply` returned.
        reason: String,
    },
    /// `apply` succeeded but the postcondition still fails. The run stopped here.
    ApplyVerificationFailed {
        /// The postcondition error after `apply`.
        reason: String,
    },
}

impl StepStatus {
    /// Returns `true` if this status stops the run.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::UnmetPrecondition { .. }
                | Self::ApplyFailed { .. }
                | Self::ApplyVerificationFailed { .. }
        )
    }

    /// Returns the status label, e.g. `already-applied`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadyApplied => "already-applied",
            Self::Applied => "applied",
            Self::WouldApply => "would-apply",
            Self::PendingDependency { .. } => "pending-dependency",
            Self::UnmetPrecondition { .. } => "unmet-precondition",
            Self::ApplyFailed { .. } => "apply-failed",
            Self::ApplyVerificationFailed { .. } => "apply-verification-failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmetPrecondition { reason }
            | Self::ApplyFailed { reason }
            | Self::ApplyVerificationFailed { reason } => write!(f, "{}: {}", self.label(), reason),
            Self::PendingDependency { dependency } => write!(f, "{}: {}", self.label(), dependency),
            _ => f.write_str(self.label()),
        }
    }
}

/// A step and its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// The step's name.
    pub step: StepName,
    /// What happened to the step. Serialized inline as `status` plus any
    /// detail fields.
    #[serde(flatten)]
    pub status: StepStatus,
    /// Commit metadata, captured for applied steps only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<Commit>,
}

/// Ordered record of every step attempted in a run.
///
/// Serializes to JSON for changelog tooling:
///
/// ```json
/// {"outcomes": [{"step": "xo:config", "status": "applied", "commit": {"type": "config", "subject": "Configure xo."}}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    outcomes: Vec<StepOutcome>,
}

impl RunReport {
    /// Returns the outcomes in execution order.
    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// Returns the `(step, status)` pairs in execution order.
    pub fn statuses(&self) -> impl Iterator<Item = (&StepName, &StepStatus)> {
        self.outcomes.iter().map(|o| (&o.step, &o.status))
    }

    /// Returns the status recorded for a step, if it was attempted.
    pub fn status_of(&self, step: &str) -> Option<&StepStatus> {
        self.outcomes
            .iter()
            .find(|o| o.step == step)
            .map(|o| &o.status)
    }

    /// Returns `true` if no step stopped the run.
    pub fn is_success(&self) -> bool {
        self.failed().is_none()
    }

    /// Returns the outcome that stopped the run.
    pub fn failed(&self) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.status.is_failure())
    }

    /// Returns the commit metadata of applied steps, in order.
    pub fn commits(&self) -> impl Iterator<Item = (&StepName, &Commit)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.commit.as_ref().map(|c| (&o.step, c)))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn record(&mut self, step: StepName, status: StepStatus, commit: Option<Commit>) {
        self.outcomes.push(StepOutcome {
            step,
            status,
            commit,
        });
    }
}

/// A validated catalog of migration steps.
///
/// Building a runner checks the whole catalog: duplicate names, unknown
/// dependencies, cycles and unknown targets are reported before any step
/// touches the project.
pub struct Runner {
    steps: Vec<Box<dyn Migration>>,
    order: Vec<usize>,
    config: RunnerConfig,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("plan", &self.plan())
            .field("config", &self.config)
            .finish()
    }
}

impl Runner {
    /// Creates a new runner builder.
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::new()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Returns the step names in the order a run would visit them.
    pub fn plan(&self) -> Vec<StepName> {
        self.order.iter().map(|&i| self.steps[i].name()).collect()
    }

    /// Returns the number of registered steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Runs the planned steps against `project`.
    ///
    /// The first failing step is recorded and ends the run; effects of the
    /// steps before it are kept.
    ///
    /// In a dry run, a step depending on one reported `would-apply` or
    /// `pending-dependency` is reported `pending-dependency` without
    /// evaluating its conditions.
    pub async fn run(&self, project: &dyn Project) -> RunReport {
        let mut report = RunReport::default();
        let mut pending = HashSet::new();
        for &index in &self.order {
            let step = self.steps[index].as_ref();
            let name = step.name();
            debug!("{}", step.fmt_debug());

            let waiting_on = step.dependencies().into_iter().find(|dep| pending.contains(dep));
            let (status, commit) = match waiting_on {
                Some(dependency) => (StepStatus::PendingDependency { dependency }, None),
                None => self.drive(step, project).await,
            };
            if matches!(status, StepStatus::WouldApply | StepStatus::PendingDependency { .. }) {
                pending.insert(name.clone());
            }
            if status.is_failure() {
                warn!("Step '{}' stopped the run: {}", name, status);
                report.record(name, status, commit);
                break;
            }
            info!("Step '{}' {}", name, status);
            report.record(name, status, commit);
        }
        report
    }

    async fn drive(&self, step: &dyn Migration, project: &dyn Project) -> (StepStatus, Option<Commit>) {
        if step.postcondition(project).await.is_ok() {
            return (StepStatus::AlreadyApplied, None);
        }
        if let Err(e) = step.precondition(project).await {
            return (
                StepStatus::UnmetPrecondition {
                    reason: e.to_string(),
                },
                None,
            );
        }
        if self.config.dry_run {
            return (StepStatus::WouldApply, None);
        }
        if let Err(e) = step.apply(project).await {
            return (
                StepStatus::ApplyFailed {
                    reason: e.to_string(),
                },
                None,
            );
        }
        match step.postcondition(project).await {
            Ok(()) => (StepStatus::Applied, step.commit()),
            Err(e) => (
                StepStatus::ApplyVerificationFailed {
                    reason: e.to_string(),
                },
                None,
            ),
        }
    }
}

/// Builder for constructing [`Runner`] instances.
#[derive(Default)]
pub struct RunnerBuilder {
    steps: Vec<Box<dyn Migration>>,
    config: RunnerConfig,
}

impl RunnerBuilder {
    /// Creates a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a step. Declaration order breaks ties between independent steps.
    pub fn add<M: Migration + 'static>(self, step: M) -> Self {
        self.add_boxed(Box::new(step))
    }

    /// Adds an already boxed step.
    pub fn add_boxed(mut self, step: Box<dyn Migration>) -> Self {
        self.steps.push(step);
        self
    }

    /// Adds several boxed steps, keeping their order.
    pub fn extend(mut self, steps: impl IntoIterator<Item = Box<dyn Migration>>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Sets the run configuration.
    pub fn config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the catalog and resolves the run order.
    pub fn build(self) -> Result<Runner, MigrationError> {
        let graph = DependencyGraph::new(&self.steps)?;
        let mut order = graph.order();

        if !self.config.targets.is_empty() {
            let roots = self
                .config
                .targets
                .iter()
                .map(|target| {
                    graph
                        .index_of(target.as_str())
                        .ok_or_else(|| MigrationError::UnknownStep(target.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let selected = graph.closure(&roots);
            order.retain(|node| selected.contains(node));
        }
        debug!(
            "Resolved plan: {:?}",
            order.iter().map(|&n| graph.name(n)).collect::<Vec<_>>()
        );

        Ok(Runner {
            steps: self.steps,
            order,
            config: self.config,
        })
    }
}

/// Validates `steps` and runs all of them against `project`.
pub async fn run(steps: Vec<Box<dyn Migration>>, project: &dyn Project) -> Result<RunReport, MigrationError> {
    let runner = Runner::builder().extend(steps).build()?;
    Ok(runner.run(project).await)
}
