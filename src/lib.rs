//! deployd - webhook-triggered continuous-deployment pipeline
//!
//! A daemon that deploys front-end projects on push notifications:
//! it pulls the latest source, installs dependencies, builds, publishes
//! the build output to the serving directory, and optionally uploads
//! sourcemaps to Sentry.
//!
//! # Architecture
//!
//! The orchestrator is the core: it sequences the external, failure-prone
//! steps of one run strictly in order, aborts on the first failure, and
//! always settles into a `RunReport`. Everything around it is thin:
//! - the webhook server acknowledges triggers immediately and runs the
//!   pipeline in the background (fire-and-forget)
//! - the registry is a static lookup built from configuration
//! - external tools (git, npm, sentry-cli) are only known through their
//!   exit status, via the `StepRunner` seam
//!
//! # Modules
//!
//! - `core`: orchestration logic (Registry, StepRunner, Orchestrator)
//! - `domain`: data structures (ProjectDescriptor, DeployRequest, RunReport)
//! - `server`: the axum webhook listener and run-history endpoints
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve the webhook endpoint
//! deployd serve
//!
//! # Deploy a project manually
//! deployd run ex-show-web
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;

// Re-export main types at crate root for convenience
pub use config::ResolvedConfig;
pub use core::{Orchestrator, PipelineError, PipelineParameters, Registry, StepRunner};
pub use domain::{DeployRequest, ProjectDescriptor, RunReport, RunState, StepKind};
