//! Core orchestration logic.
//!
//! This module contains:
//! - Registry: project lookup over the configured table
//! - PipelineParameters: per-run path and flag derivation
//! - StepRunner: single-command execution (the atomic unit)
//! - Orchestrator: ordered, fail-fast step sequencing
//! - sourcemap: the two-step Sentry upload sub-pipeline

pub mod params;
pub mod pipeline;
pub mod publish;
pub mod registry;
pub mod runner;
pub mod sourcemap;

// Re-export commonly used types
pub use params::{PipelineParameters, SourcemapParams};
pub use pipeline::{Orchestrator, PipelineError, RunContext};
pub use registry::{Registry, UnknownProject};
pub use runner::{CommandSpec, ProcessRunner, StepError, StepRunner};
