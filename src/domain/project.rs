//! Project descriptors and deploy triggers.

use serde::{Deserialize, Serialize};

/// A deployable project known to the registry.
///
/// Built from configuration at startup and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Project identifier as sent by the webhook (the repository name)
    pub project_id: String,

    /// Local folder name under the deployment root
    pub folder: String,

    /// Sentry project slug, for projects that upload sourcemaps
    pub sentry_project: Option<String>,
}

/// A single deploy trigger, from the webhook or the CLI.
///
/// A bare project name runs fetch/install/build/publish. Supplying both
/// sourcemap fields additionally enables the sourcemap upload sub-pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    /// Project identifier
    pub project: String,

    /// Public URL prefix the built JS is served from
    /// (e.g. `http://exshow.example.com/static/js`)
    #[serde(default)]
    pub sourcemap_url_prefix: Option<String>,

    /// Directory holding the `.map` files, relative to the checkout
    /// (e.g. `dist/static/js`)
    #[serde(default)]
    pub sourcemap_dir: Option<String>,
}

impl DeployRequest {
    /// Create a plain request without sourcemap upload
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            sourcemap_url_prefix: None,
            sourcemap_dir: None,
        }
    }

    /// True when the trigger supplies both sourcemap parameters
    pub fn wants_sourcemap_upload(&self) -> bool {
        self.sourcemap_url_prefix.is_some() && self.sourcemap_dir.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_request_skips_sourcemaps() {
        let request = DeployRequest::new("ex-show-web");
        assert!(!request.wants_sourcemap_upload());
    }

    #[test]
    fn test_request_with_both_params_uploads() {
        let request = DeployRequest {
            project: "ex-show-web".to_string(),
            sourcemap_url_prefix: Some("http://x/js".to_string()),
            sourcemap_dir: Some("dist/js".to_string()),
        };
        assert!(request.wants_sourcemap_upload());
    }

    #[test]
    fn test_partial_params_do_not_upload() {
        let request = DeployRequest {
            project: "ex-show-web".to_string(),
            sourcemap_url_prefix: Some("http://x/js".to_string()),
            sourcemap_dir: None,
        };
        assert!(!request.wants_sourcemap_upload());
    }
}
