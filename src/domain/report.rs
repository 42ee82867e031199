//! Run reports: the outcome and step trace of one pipeline run.
//!
//! A RunReport is the orchestrator's only output. The run either succeeds
//! or fails at a named step; either way the caller gets a report, never an
//! unhandled error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The steps a deploy pipeline can execute, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// `git pull` in the checkout, plus manifest version read
    Fetch,

    /// `npm install` in the checkout
    Install,

    /// `npm run build` in the checkout
    Build,

    /// Replace the publish directory contents with the build output
    Publish,

    /// `sentry-cli releases ... new <version>`
    RegisterRelease,

    /// `sentry-cli releases ... upload-sourcemaps`
    UploadMaps,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepKind::Fetch => "fetch",
            StepKind::Install => "install",
            StepKind::Build => "build",
            StepKind::Publish => "publish",
            StepKind::RegisterRelease => "register_release",
            StepKind::UploadMaps => "upload_maps",
        };
        f.write_str(name)
    }
}

/// Status of a single step within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

/// One step's entry in the run trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub kind: StepKind,
    pub status: StepStatus,

    /// Failure detail (command and exit status where applicable)
    pub detail: Option<String>,

    /// Wall-clock duration, set on completion
    pub duration_ms: Option<u64>,
}

/// Terminal (or in-flight) state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Currently executing
    Running,

    /// All applicable steps completed
    Succeeded,

    /// Aborted at the named step
    Failed { step: StepKind, error: String },
}

/// A single pipeline execution, from trigger to terminal outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Project being deployed
    pub project: String,

    /// Current state of the run
    pub state: RunState,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,

    /// Ordered trace of executed steps
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    /// Create a new in-flight report
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project: project.into(),
            state: RunState::Running,
            started_at: Utc::now(),
            completed_at: None,
            steps: Vec::new(),
        }
    }

    /// Record that a step has started
    pub fn step_started(&mut self, kind: StepKind) {
        self.steps.push(StepRecord {
            kind,
            status: StepStatus::Running,
            detail: None,
            duration_ms: None,
        });
    }

    /// Mark the most recent record of `kind` as completed
    pub fn step_completed(&mut self, kind: StepKind, duration_ms: u64) {
        if let Some(record) = self.steps.iter_mut().rev().find(|r| r.kind == kind) {
            record.status = StepStatus::Completed;
            record.duration_ms = Some(duration_ms);
        }
    }

    /// Mark the most recent record of `kind` as failed, appending a record
    /// if the step failed before it ever started (e.g. a missing version).
    pub fn step_failed(&mut self, kind: StepKind, detail: impl Into<String>) {
        match self.steps.iter_mut().rev().find(|r| r.kind == kind) {
            Some(record) => {
                record.status = StepStatus::Failed;
                record.detail = Some(detail.into());
            }
            None => self.steps.push(StepRecord {
                kind,
                status: StepStatus::Failed,
                detail: Some(detail.into()),
                duration_ms: None,
            }),
        }
    }

    /// Finish the run successfully
    pub fn succeed(&mut self) {
        self.state = RunState::Succeeded;
        self.completed_at = Some(Utc::now());
    }

    /// Finish the run at a failed step
    pub fn fail(&mut self, step: StepKind, error: impl Into<String>) {
        self.state = RunState::Failed {
            step,
            error: error.into(),
        };
        self.completed_at = Some(Utc::now());
    }

    /// Check if the run is still in progress
    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    /// Check if the run succeeded
    pub fn is_succeeded(&self) -> bool {
        matches!(self.state, RunState::Succeeded)
    }

    /// Step kinds in execution order, mostly useful for assertions and logs
    pub fn executed_steps(&self) -> Vec<StepKind> {
        self.steps.iter().map(|r| r.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lifecycle() {
        let mut report = RunReport::new("ex-show-web");
        assert!(report.is_running());

        report.step_started(StepKind::Fetch);
        report.step_completed(StepKind::Fetch, 120);
        report.succeed();

        assert!(report.is_succeeded());
        assert!(report.completed_at.is_some());
        assert_eq!(report.steps[0].status, StepStatus::Completed);
        assert_eq!(report.steps[0].duration_ms, Some(120));
    }

    #[test]
    fn test_step_failed_without_start_appends_record() {
        let mut report = RunReport::new("ex-show-web");
        report.step_failed(StepKind::RegisterRelease, "no version");
        report.fail(StepKind::RegisterRelease, "no version");

        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].status, StepStatus::Failed);
        assert_eq!(
            report.state,
            RunState::Failed {
                step: StepKind::RegisterRelease,
                error: "no version".to_string()
            }
        );
    }

    #[test]
    fn test_executed_steps_preserves_order() {
        let mut report = RunReport::new("p");
        report.step_started(StepKind::Fetch);
        report.step_completed(StepKind::Fetch, 1);
        report.step_started(StepKind::Install);

        assert_eq!(
            report.executed_steps(),
            vec![StepKind::Fetch, StepKind::Install]
        );
    }
}
