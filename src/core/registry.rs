//! Project registry: webhook project name to descriptor lookup.
//!
//! Built once from the resolved configuration and read-only afterwards.
//! Safe to share across concurrent triggers.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::ResolvedConfig;
use crate::domain::ProjectDescriptor;

/// Lookup failed: the project is not in the configured table.
#[derive(Debug, Clone, Error)]
#[error("unknown project '{0}'")]
pub struct UnknownProject(pub String);

/// Static table of deployable projects
#[derive(Debug, Clone, Default)]
pub struct Registry {
    projects: BTreeMap<String, ProjectDescriptor>,
}

impl Registry {
    /// Build the registry from the configured project table
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let projects = config
            .projects
            .iter()
            .map(|(id, entry)| {
                (
                    id.clone(),
                    ProjectDescriptor {
                        project_id: id.clone(),
                        folder: entry.folder.clone(),
                        sentry_project: entry.sentry_project.clone(),
                    },
                )
            })
            .collect();

        Self { projects }
    }

    /// Build a registry directly from descriptors (test tables)
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ProjectDescriptor>) -> Self {
        Self {
            projects: descriptors
                .into_iter()
                .map(|d| (d.project_id.clone(), d))
                .collect(),
        }
    }

    /// Look up a project by its webhook identifier
    pub fn resolve(&self, project_id: &str) -> Result<&ProjectDescriptor, UnknownProject> {
        self.projects
            .get(project_id)
            .ok_or_else(|| UnknownProject(project_id.to_string()))
    }

    /// Iterate all known descriptors, sorted by project id
    pub fn iter(&self) -> impl Iterator<Item = &ProjectDescriptor> {
        self.projects.values()
    }

    /// Number of known projects
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// True when no projects are configured
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> Registry {
        Registry::from_descriptors([
            ProjectDescriptor {
                project_id: "ex-show-web".to_string(),
                folder: "ex-show".to_string(),
                sentry_project: Some("exshow".to_string()),
            },
            ProjectDescriptor {
                project_id: "organizer-management".to_string(),
                folder: "huizhanren-management".to_string(),
                sentry_project: None,
            },
        ])
    }

    #[test]
    fn test_resolve_known_project() {
        let registry = test_registry();
        let descriptor = registry.resolve("ex-show-web").unwrap();

        assert_eq!(descriptor.folder, "ex-show");
        assert_eq!(descriptor.sentry_project.as_deref(), Some("exshow"));
    }

    #[test]
    fn test_resolve_unknown_project() {
        let registry = test_registry();
        let err = registry.resolve("nope").unwrap_err();

        assert_eq!(err.0, "nope");
        assert_eq!(err.to_string(), "unknown project 'nope'");
    }

    #[test]
    fn test_iter_is_sorted() {
        let registry = test_registry();
        let ids: Vec<&str> = registry.iter().map(|d| d.project_id.as_str()).collect();
        assert_eq!(ids, vec!["ex-show-web", "organizer-management"]);
    }
}
