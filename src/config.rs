//! Configuration for deployd.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DEPLOYD_CONFIG, DEPLOYD_ROOT, DEPLOYD_LISTEN)
//! 2. Config file (.deployd/config.yaml)
//! 3. Defaults (~/front-end, 0.0.0.0:8888)
//!
//! Config file discovery searches the current directory and its parents
//! for .deployd/config.yaml. The resolved config is an explicit value
//! passed into the registry and orchestrator, never a process global, so
//! tests can construct alternate project tables directly.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default listen address (the port the original webhook service used)
const DEFAULT_LISTEN: &str = "0.0.0.0:8888";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,

    /// Root directory all project checkouts and publish dirs live under
    pub root_dir: Option<String>,

    /// Webhook listen address
    pub listen: Option<String>,

    /// Branch pulled by the fetch step (default: master)
    pub branch: Option<String>,

    #[serde(default)]
    pub sentry: Option<SentryConfig>,

    /// Project table: webhook project name -> project settings
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentryConfig {
    /// Sentry organization slug used by the sourcemap upload steps
    pub org: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Local folder name under the root directory
    pub folder: String,

    /// Sentry project slug, for sourcemap-enabled projects
    #[serde(default)]
    pub sentry_project: Option<String>,
}

/// Resolved configuration with absolute paths and parsed addresses
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute root directory for checkouts and publish dirs
    pub root_dir: PathBuf,

    /// Webhook listen address
    pub listen: SocketAddr,

    /// Branch pulled by the fetch step
    pub branch: String,

    /// Sentry organization slug (absent disables sourcemap uploads)
    pub sentry_org: Option<String>,

    /// Project table
    pub projects: BTreeMap<String, ProjectConfig>,

    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Load configuration, preferring `path` over discovery and env defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var("DEPLOYD_CONFIG")
                .ok()
                .map(PathBuf::from)
                .or_else(find_config_file),
        };

        let file = match &config_file {
            Some(p) => Some(load_config_file(p)?),
            None => None,
        };

        Self::resolve(file, config_file)
    }

    /// Resolve a parsed config file (or none) against env vars and defaults
    pub fn resolve(file: Option<ConfigFile>, config_file: Option<PathBuf>) -> Result<Self> {
        let default_root = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join("front-end");

        let file = file.unwrap_or(ConfigFile {
            version: "1".to_string(),
            root_dir: None,
            listen: None,
            branch: None,
            sentry: None,
            projects: BTreeMap::new(),
        });

        let root_dir = if let Ok(env_root) = std::env::var("DEPLOYD_ROOT") {
            PathBuf::from(env_root)
        } else if let Some(ref root) = file.root_dir {
            resolve_path(config_base(&config_file), root)
        } else {
            default_root
        };

        let listen_str = std::env::var("DEPLOYD_LISTEN")
            .ok()
            .or(file.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen_str
            .parse()
            .with_context(|| format!("Invalid listen address: {}", listen_str))?;

        Ok(Self {
            root_dir,
            listen,
            branch: file.branch.unwrap_or_else(|| "master".to_string()),
            sentry_org: file.sentry.map(|s| s.org),
            projects: file.projects,
            config_file,
        })
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".deployd").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Base directory relative config-file paths resolve against
fn config_base(config_file: &Option<PathBuf>) -> &Path {
    config_file
        .as_deref()
        .and_then(|p| p.parent()) // .deployd/
        .and_then(|p| p.parent()) // project root
        .unwrap_or(Path::new("."))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}
