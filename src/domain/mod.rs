//! Domain types for the deployd pipeline.
//!
//! This module contains the core data structures:
//! - ProjectDescriptor / DeployRequest: registry entries and triggers
//! - RunReport: per-run outcome and ordered step trace

pub mod project;
pub mod report;

// Re-export commonly used types
pub use project::{DeployRequest, ProjectDescriptor};
pub use report::{RunReport, RunState, StepKind, StepRecord, StepStatus};
