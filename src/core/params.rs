//! Pipeline parameter derivation.
//!
//! Turns a registry descriptor plus a trigger into the fully resolved,
//! immutable parameter set one run needs: where the checkout lives, where
//! the build lands, where artifacts get published, and whether sourcemaps
//! are uploaded.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::domain::{DeployRequest, ProjectDescriptor};

/// Sourcemap upload inputs taken verbatim from the trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcemapParams {
    /// Public URL prefix the built JS is served from
    pub url_prefix: String,

    /// Map file directory relative to the checkout
    pub map_dir: String,
}

/// Everything one pipeline run needs, derived once per trigger
#[derive(Debug, Clone, Serialize)]
pub struct PipelineParameters {
    pub project_id: String,

    /// Git checkout: `<root>/<folder>/repository/<project_id>`
    pub source_dir: PathBuf,

    /// Build output inside the checkout: `<source_dir>/dist`
    pub build_output_dir: PathBuf,

    /// Served directory replaced on publish: `<root>/<folder>/dist`
    pub publish_dir: PathBuf,

    /// Branch pulled by the fetch step
    pub branch: String,

    /// Sentry organization slug, from config
    pub sentry_org: Option<String>,

    /// Sentry project slug, from the descriptor
    pub sentry_project: Option<String>,

    /// Present iff the trigger supplied both sourcemap parameters
    pub sourcemap: Option<SourcemapParams>,
}

impl PipelineParameters {
    /// Derive run parameters from config, descriptor and trigger
    pub fn derive(
        config: &ResolvedConfig,
        descriptor: &ProjectDescriptor,
        request: &DeployRequest,
    ) -> Self {
        let project_root = config.root_dir.join(&descriptor.folder);
        let source_dir = project_root
            .join("repository")
            .join(&descriptor.project_id);

        let sourcemap = match (&request.sourcemap_url_prefix, &request.sourcemap_dir) {
            (Some(url_prefix), Some(map_dir)) => Some(SourcemapParams {
                url_prefix: url_prefix.clone(),
                map_dir: map_dir.clone(),
            }),
            _ => None,
        };

        Self {
            project_id: descriptor.project_id.clone(),
            build_output_dir: source_dir.join("dist"),
            publish_dir: project_root.join("dist"),
            source_dir,
            branch: config.branch.clone(),
            sentry_org: config.sentry_org.clone(),
            sentry_project: descriptor.sentry_project.clone(),
            sourcemap,
        }
    }

    /// True when this run ends with the sourcemap upload sub-pipeline
    pub fn needs_sourcemap_upload(&self) -> bool {
        self.sourcemap.is_some()
    }

    /// Path of the manifest the fetch step reads the version from
    pub fn manifest_path(&self) -> PathBuf {
        self.source_dir.join("package.json")
    }
}
