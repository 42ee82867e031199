//! Webhook HTTP server.
//!
//! Thin I/O wrapper around the orchestrator: a push hook is acknowledged
//! immediately and the pipeline run is dispatched as a background task
//! (fire-and-forget, so webhook latency never depends on build duration).
//! Outcomes are observable through `GET /runs` and the process logs rather
//! than the hook response.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ResolvedConfig;
use crate::core::{Orchestrator, PipelineParameters, Registry};
use crate::domain::{DeployRequest, RunReport};

/// Completed runs this process remembers, newest first
const HISTORY_CAP: usize = 64;

/// Bounded in-memory history of completed runs.
///
/// The status channel for a fire-and-forget trigger: nothing is persisted
/// across restarts.
#[derive(Debug, Default)]
pub struct RunHistory {
    inner: Mutex<VecDeque<RunReport>>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed run, evicting the oldest past the cap
    pub fn push(&self, report: RunReport) {
        let mut runs = self.inner.lock().unwrap();
        runs.push_front(report);
        runs.truncate(HISTORY_CAP);
    }

    /// Recent runs, newest first
    pub fn recent(&self) -> Vec<RunReport> {
        self.inner.lock().unwrap().iter().cloned().collect()
    }

    /// Look up one run by id
    pub fn get(&self, id: Uuid) -> Option<RunReport> {
        self.inner.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }
}

/// Per-project async locks.
///
/// Two runs for the same project share a checkout and a publish directory,
/// so they must not interleave. Different projects run concurrently; the
/// step runner passes working directories explicitly and shares no process
/// state.
#[derive(Debug, Default)]
pub struct ProjectLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `project`, waiting for any in-flight run
    pub async fn acquire(&self, project: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap();
            locks
                .entry(project.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<ResolvedConfig>,
    registry: Arc<Registry>,
    orchestrator: Arc<Orchestrator>,
    history: Arc<RunHistory>,
    locks: Arc<ProjectLocks>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Serve the webhook endpoints until the process is stopped
pub async fn serve(config: ResolvedConfig) -> anyhow::Result<()> {
    let listen = config.listen;
    let registry = Registry::from_config(&config);
    info!(projects = registry.len(), %listen, "starting webhook server");

    let state = AppState {
        config: Arc::new(config),
        registry: Arc::new(registry),
        orchestrator: Arc::new(Orchestrator::new()),
        history: Arc::new(RunHistory::new()),
        locks: Arc::new(ProjectLocks::new()),
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .context("bind webhook listener failed")?;
    axum::serve(listener, app)
        .await
        .context("webhook server terminated with error")
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/hooks/push", post(handle_push))
        .route("/runs", get(list_runs))
        .route("/runs/{id}", get(get_run))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Accept a push trigger and dispatch the pipeline in the background.
///
/// Responds with the fixed acknowledgement before the run finishes; only
/// an unknown project is rejected up front, before any command runs.
async fn handle_push(
    State(state): State<AppState>,
    Json(request): Json<DeployRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let descriptor = state.registry.resolve(&request.project).map_err(|e| {
        warn!(project = %request.project, "push for unknown project");
        (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                code: "unknown_project".to_string(),
                message: e.to_string(),
            }),
        )
    })?;

    let params = PipelineParameters::derive(&state.config, descriptor, &request);
    info!(
        project = %params.project_id,
        sourcemaps = params.needs_sourcemap_upload(),
        "dispatching deploy run"
    );

    let task_state = state.clone();
    tokio::spawn(async move {
        let _guard = task_state.locks.acquire(&params.project_id).await;
        let report = task_state.orchestrator.run(&params).await;
        task_state.history.push(report);
    });

    Ok(Json(serde_json::json!({"result": "ok"})))
}

async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunReport>> {
    Json(state.history.recent())
}

async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunReport>, (StatusCode, Json<ErrorBody>)> {
    state.history.get(id).map(Json).ok_or((
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            code: "unknown_run".to_string(),
            message: format!("run {} not found", id),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded_and_newest_first() {
        let history = RunHistory::new();

        for i in 0..(HISTORY_CAP + 10) {
            history.push(RunReport::new(format!("p{}", i)));
        }

        let recent = history.recent();
        assert_eq!(recent.len(), HISTORY_CAP);
        assert_eq!(recent[0].project, format!("p{}", HISTORY_CAP + 9));
    }

    #[test]
    fn test_history_lookup_by_id() {
        let history = RunHistory::new();
        let report = RunReport::new("ex-show-web");
        let id = report.id;
        history.push(report);

        assert!(history.get(id).is_some());
        assert!(history.get(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn test_project_lock_serializes_same_project() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let locks = Arc::new(ProjectLocks::new());
        let active = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let active = active.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("ex-show-web").await;
                assert!(!active.swap(true, Ordering::SeqCst), "runs interleaved");
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                active.store(false, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_different_projects_do_not_block() {
        let locks = ProjectLocks::new();

        let _a = locks.acquire("p1").await;
        // Acquiring another project's lock must not deadlock
        let _b = locks.acquire("p2").await;
    }
}
