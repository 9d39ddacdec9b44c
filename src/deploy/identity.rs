// ABOUTME: Derives the deterministic deployment identity from the artifact path.
// ABOUTME: Pool name and virtual path both come from the parent directory name.

use std::path::Path;

use super::error::DeployError;
use crate::types::{PoolName, VirtualPath};

/// Well-known name of the site shared by all deployments on a machine.
pub const SITE_NAME: &str = "testdock";

/// Fixed port the shared site binds. One constant per machine; deployments
/// coexist under it as distinct virtual paths.
pub const SITE_PORT: u16 = 5100;

/// Derived identity uniquely naming one deployment's registry resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentIdentity {
    pub pool_name: PoolName,
    pub virtual_path: VirtualPath,
    pub port: u16,
}

impl DeploymentIdentity {
    /// Derive the identity from an application path.
    ///
    /// The seed is the *parent* directory name, not the leaf: re-publishing
    /// into a fresh leaf directory under a stable parent keeps the identity
    /// stable and human-readable across runs of the same logical test.
    pub fn derive(application_path: &Path) -> Result<Self, DeployError> {
        let seed = application_path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DeployError::Configuration(format!(
                    "application path {} has no parent directory segment",
                    application_path.display()
                ))
            })?;

        let pool_name = PoolName::new(seed).map_err(|e| {
            DeployError::Configuration(format!("directory name {seed:?} is not usable: {e}"))
        })?;
        let virtual_path = VirtualPath::from_segment(seed).map_err(|e| {
            DeployError::Configuration(format!("directory name {seed:?} is not usable: {e}"))
        })?;

        Ok(Self {
            pool_name,
            virtual_path,
            port: SITE_PORT,
        })
    }

    /// Base URI of the deployed application, trailing slash included.
    pub fn base_uri(&self) -> String {
        format!("http://localhost:{}{}/", self.port, self.virtual_path)
    }
}
