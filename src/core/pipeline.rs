//! Main orchestrator for deploy pipeline execution.
//!
//! Sequences fetch, install, build, publish and the optional sourcemap
//! upload for one run. Steps run strictly in order; the first failure
//! aborts the rest. The orchestrator never lets an error escape its
//! boundary: `run` always settles into a RunReport.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, instrument};

use crate::domain::{RunReport, StepKind};

use super::params::PipelineParameters;
use super::publish;
use super::runner::{CommandSpec, ProcessRunner, StepError, StepRunner};
use super::sourcemap;

/// Mutable per-run state threaded between steps.
///
/// Exactly one context exists per run; the fetch step populates the
/// version and only the sourcemap sub-pipeline consumes it.
#[derive(Debug, Default)]
pub struct RunContext {
    /// Version string read from the manifest after a successful fetch
    pub resolved_version: Option<String>,
}

/// A pipeline run aborted at the named step
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("fetch failed: {detail}")]
    Fetch { detail: String },

    #[error("install failed: {detail}")]
    Install { detail: String },

    #[error("build failed: {detail}")]
    Build { detail: String },

    #[error("publish failed: {detail}")]
    Publish { detail: String },

    #[error("sourcemap upload for '{project}' requires a version from the fetch step")]
    MissingVersion { project: String },

    #[error("release registration failed: {detail}")]
    ReleaseRegistration { detail: String },

    #[error("sourcemap upload failed: {detail}")]
    MapUpload { detail: String },
}

impl PipelineError {
    /// The step this error aborted the run at
    pub fn step(&self) -> StepKind {
        match self {
            PipelineError::Fetch { .. } => StepKind::Fetch,
            PipelineError::Install { .. } => StepKind::Install,
            PipelineError::Build { .. } => StepKind::Build,
            PipelineError::Publish { .. } => StepKind::Publish,
            PipelineError::MissingVersion { .. } => StepKind::RegisterRelease,
            PipelineError::ReleaseRegistration { .. } => StepKind::RegisterRelease,
            PipelineError::MapUpload { .. } => StepKind::UploadMaps,
        }
    }
}

/// Main deploy pipeline orchestrator
pub struct Orchestrator {
    runner: Arc<dyn StepRunner>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator backed by real subprocesses
    pub fn new() -> Self {
        Self {
            runner: Arc::new(ProcessRunner::new()),
        }
    }

    /// Create an orchestrator with a custom step runner (test doubles)
    pub fn with_runner(runner: Arc<dyn StepRunner>) -> Self {
        Self { runner }
    }

    /// Execute one deploy run to completion or first failure.
    ///
    /// Always returns a report; failures are recorded in it, never thrown.
    #[instrument(skip(self, params), fields(project = %params.project_id))]
    pub async fn run(&self, params: &PipelineParameters) -> RunReport {
        let mut report = RunReport::new(&params.project_id);
        info!(run_id = %report.id, "starting deploy run");

        let mut ctx = RunContext::default();

        match self.run_steps(params, &mut ctx, &mut report).await {
            Ok(()) => {
                info!(run_id = %report.id, "deploy run succeeded");
                report.succeed();
            }
            Err(e) => {
                error!(run_id = %report.id, step = %e.step(), error = %e, "deploy run failed");
                report.step_failed(e.step(), e.to_string());
                report.fail(e.step(), e.to_string());
            }
        }

        report
    }

    async fn run_steps(
        &self,
        params: &PipelineParameters,
        ctx: &mut RunContext,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        self.fetch(params, ctx, report).await?;
        self.install(params, report).await?;
        self.build(params, report).await?;
        self.publish(params, report).await?;

        if let Some(ref sourcemap_params) = params.sourcemap {
            let version = ctx.resolved_version.clone().ok_or_else(|| {
                PipelineError::MissingVersion {
                    project: params.project_id.clone(),
                }
            })?;

            let org = params.sentry_org.clone().ok_or_else(|| {
                PipelineError::ReleaseRegistration {
                    detail: "no sentry organization configured".to_string(),
                }
            })?;

            // Sentry convention: project slug defaults to the repo name
            let sentry_project = params
                .sentry_project
                .clone()
                .unwrap_or_else(|| params.project_id.clone());

            sourcemap::upload(
                self.runner.as_ref(),
                &org,
                &sentry_project,
                &version,
                &params.source_dir,
                sourcemap_params,
                report,
            )
            .await?;
        }

        Ok(())
    }

    /// Pull the branch, then read the version from the manifest.
    ///
    /// A missing or unparsable manifest is a fetch failure; a manifest
    /// without a string `version` field only fails later if the run needs
    /// the sourcemap upload.
    async fn fetch(
        &self,
        params: &PipelineParameters,
        ctx: &mut RunContext,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let command = CommandSpec::new("git", ["pull", "origin", params.branch.as_str()]);

        execute_step(
            self.runner.as_ref(),
            report,
            StepKind::Fetch,
            &command,
            &params.source_dir,
        )
        .await
        .map_err(|e| PipelineError::Fetch {
            detail: e.to_string(),
        })?;

        let manifest_path = params.manifest_path();
        let content = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| PipelineError::Fetch {
                detail: format!("manifest {}: {}", manifest_path.display(), e),
            })?;

        let manifest: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| PipelineError::Fetch {
                detail: format!("manifest {}: {}", manifest_path.display(), e),
            })?;

        ctx.resolved_version = manifest
            .get("version")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        match &ctx.resolved_version {
            Some(version) => info!(project = %params.project_id, %version, "resolved manifest version"),
            None => info!(project = %params.project_id, "manifest has no version field"),
        }

        Ok(())
    }

    async fn install(
        &self,
        params: &PipelineParameters,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let command = CommandSpec::new("npm", ["install"]);

        execute_step(
            self.runner.as_ref(),
            report,
            StepKind::Install,
            &command,
            &params.source_dir,
        )
        .await
        .map_err(|e| PipelineError::Install {
            detail: e.to_string(),
        })
    }

    async fn build(
        &self,
        params: &PipelineParameters,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let command = CommandSpec::new("npm", ["run", "build"]);

        execute_step(
            self.runner.as_ref(),
            report,
            StepKind::Build,
            &command,
            &params.source_dir,
        )
        .await
        .map_err(|e| PipelineError::Build {
            detail: e.to_string(),
        })
    }

    /// Replace the publish directory contents with the build output.
    ///
    /// Blocking filesystem work, moved off the async runtime.
    async fn publish(
        &self,
        params: &PipelineParameters,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        report.step_started(StepKind::Publish);
        let started = Instant::now();

        let build_output_dir = params.build_output_dir.clone();
        let publish_dir = params.publish_dir.clone();

        let result = tokio::task::spawn_blocking(move || {
            publish::replace_dir_contents(&build_output_dir, &publish_dir)
        })
        .await
        .map_err(|e| PipelineError::Publish {
            detail: format!("publish task panicked: {}", e),
        })?;

        result.map_err(|e| PipelineError::Publish {
            detail: e.to_string(),
        })?;

        report.step_completed(StepKind::Publish, started.elapsed().as_millis() as u64);
        info!(
            project = %params.project_id,
            publish_dir = %params.publish_dir.display(),
            "published build output"
        );

        Ok(())
    }
}

/// Run one external-command step, recording it in the report.
///
/// On failure the record is left Running; the orchestrator marks it failed
/// when it settles the run, so sub-pipelines share the same bookkeeping.
pub(crate) async fn execute_step(
    runner: &dyn StepRunner,
    report: &mut RunReport,
    kind: StepKind,
    command: &CommandSpec,
    workdir: &Path,
) -> Result<(), StepError> {
    info!(step = %kind, command = %command, "step started");
    report.step_started(kind);
    let started = Instant::now();

    runner.execute(command, workdir).await?;

    let duration_ms = started.elapsed().as_millis() as u64;
    report.step_completed(kind, duration_ms);
    info!(step = %kind, duration_ms, "step completed");

    Ok(())
}
