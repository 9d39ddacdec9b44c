// ABOUTME: Deployment parameters supplied by the caller or a testdock.yml file.
// ABOUTME: Immutable input describing the artifact, environment, and host variant.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const PARAMS_FILENAME: &str = "testdock.yml";

/// Processor architecture the execution pool runs the application under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    X64,
    X86,
}

impl Architecture {
    /// Whether the pool must be created with 32-bit execution enabled.
    pub fn is_32_bit(self) -> bool {
        matches!(self, Architecture::X86)
    }
}

/// Request pipeline variant of the hosting server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerVariant {
    #[default]
    Integrated,
    Classic,
}

impl ServerVariant {
    /// The classic pipeline only routes extension-mapped requests by default,
    /// so the application config must be patched to send everything through
    /// the managed pipeline.
    pub fn requires_pipeline_patch(self) -> bool {
        matches!(self, ServerVariant::Classic)
    }
}

/// Immutable input for one deployment. Owned by the caller; the orchestrator
/// only ever reads it.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentParameters {
    /// Path to the built application artifact directory.
    pub application_path: PathBuf,

    /// Name of the environment the application should select at startup.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub architecture: Architecture,

    #[serde(default)]
    pub server_variant: ServerVariant,

    /// Runtime version requested for the execution pool.
    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,

    /// Warm-up interval waited after registration before the endpoint is
    /// handed to the caller.
    #[serde(default = "default_warm_up", with = "humantime_serde")]
    pub warm_up: Duration,

    /// Admin endpoint of the host-manager registry (`host:port`). When unset
    /// the caller is expected to supply an in-process registry.
    #[serde(default)]
    pub registry_endpoint: Option<String>,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_runtime_version() -> String {
    "v4.0".to_string()
}

fn default_warm_up() -> Duration {
    Duration::from_secs(1)
}

impl DeploymentParameters {
    /// Parameters for an artifact with all defaults.
    pub fn new(application_path: impl Into<PathBuf>) -> Self {
        Self {
            application_path: application_path.into(),
            environment: default_environment(),
            architecture: Architecture::default(),
            server_variant: ServerVariant::default(),
            runtime_version: default_runtime_version(),
            warm_up: default_warm_up(),
            registry_endpoint: None,
        }
    }

    /// Parse parameters from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load parameters from a `testdock.yml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ParamsNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}
