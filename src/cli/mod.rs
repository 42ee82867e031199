//! Command-line interface for deployd.
//!
//! Provides commands for serving the webhook endpoint, triggering a deploy
//! manually, and inspecting the configured project table.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::ResolvedConfig;
use crate::core::{Orchestrator, PipelineParameters, Registry};
use crate::domain::{DeployRequest, RunState};
use crate::server;

/// deployd - webhook-triggered continuous-deployment pipeline
#[derive(Parser, Debug)]
#[command(name = "deployd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: discovered .deployd/config.yaml)
    #[arg(short, long, global = true, env = "DEPLOYD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the webhook server
    Serve {
        /// Address to bind to (overrides config)
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },

    /// Run one deploy pipeline in the foreground
    Run {
        /// Project identifier (must be in the configured table)
        project: String,

        /// Public URL prefix for sourcemap upload
        #[arg(long)]
        sourcemap_url_prefix: Option<String>,

        /// Map directory relative to the checkout, for sourcemap upload
        #[arg(long)]
        sourcemap_dir: Option<String>,
    },

    /// List configured projects
    Projects,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let mut config = ResolvedConfig::load(self.config.as_deref())?;

        match self.command {
            Commands::Serve { listen } => {
                if let Some(listen) = listen {
                    config.listen = listen;
                }
                server::serve(config).await
            }

            Commands::Run {
                project,
                sourcemap_url_prefix,
                sourcemap_dir,
            } => {
                let registry = Registry::from_config(&config);
                let descriptor = registry
                    .resolve(&project)
                    .with_context(|| format!("cannot deploy '{}'", project))?;

                let request = DeployRequest {
                    project: project.clone(),
                    sourcemap_url_prefix,
                    sourcemap_dir,
                };
                let params = PipelineParameters::derive(&config, descriptor, &request);

                let report = Orchestrator::new().run(&params).await;
                println!("{}", serde_json::to_string_pretty(&report)?);

                match report.state {
                    RunState::Failed { step, error } => {
                        bail!("deploy failed at {}: {}", step, error)
                    }
                    _ => Ok(()),
                }
            }

            Commands::Projects => {
                let registry = Registry::from_config(&config);
                if registry.is_empty() {
                    println!("no projects configured");
                    return Ok(());
                }

                for descriptor in registry.iter() {
                    match &descriptor.sentry_project {
                        Some(sentry) => println!(
                            "{}  folder={}  sentry={}",
                            descriptor.project_id, descriptor.folder, sentry
                        ),
                        None => println!(
                            "{}  folder={}",
                            descriptor.project_id, descriptor.folder
                        ),
                    }
                }
                Ok(())
            }

            Commands::Config => {
                println!("root_dir: {}", config.root_dir.display());
                println!("listen: {}", config.listen);
                println!("branch: {}", config.branch);
                println!(
                    "sentry_org: {}",
                    config.sentry_org.as_deref().unwrap_or("(none)")
                );
                match &config.config_file {
                    Some(path) => println!("config_file: {}", path.display()),
                    None => println!("config_file: (defaults)"),
                }
                println!("projects: {}", config.projects.len());
                Ok(())
            }
        }
    }
}
