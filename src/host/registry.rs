// ABOUTME: Capability trait for the shared host-manager registry.
// ABOUTME: Pools, a shared site, and applications registered under it.

use async_trait::async_trait;
use std::path::Path;

use super::error::RegistryError;
use crate::types::{AppHandle, PoolHandle, PoolName, SiteHandle, VirtualPath};

/// Client interface to the shared environment registry.
///
/// All operations may block on network/IPC and surface failures immediately;
/// no retries are attempted at this layer. The registry is not safe for
/// concurrent structural mutation: any sequence spanning more than one call
/// must be serialized through the process-wide
/// [`RegistryGate`](crate::deploy::RegistryGate) when multiple deployments
/// may be live.
#[async_trait]
pub trait HostRegistry: Send + Sync {
    /// Create an isolated execution pool.
    async fn create_pool(
        &self,
        name: &PoolName,
        runtime_version: &str,
        is_32_bit: bool,
    ) -> Result<PoolHandle, RegistryError>;

    /// Look up the site by name, creating it bound to `port` when absent.
    /// The site is shared between deployments and never owned by one of them.
    async fn find_or_create_site(
        &self,
        name: &str,
        root_dir: &Path,
        port: u16,
    ) -> Result<SiteHandle, RegistryError>;

    /// Register an application under the site at the given virtual path.
    async fn add_application(
        &self,
        site: &SiteHandle,
        virtual_path: &VirtualPath,
        physical_path: &Path,
        pool: &PoolHandle,
    ) -> Result<AppHandle, RegistryError>;

    /// Find the application registered at a virtual path, if any.
    async fn find_application(
        &self,
        site: &SiteHandle,
        virtual_path: &VirtualPath,
    ) -> Result<Option<AppHandle>, RegistryError>;

    /// Apply staged mutations to the running host manager.
    async fn commit(&self) -> Result<(), RegistryError>;

    /// Stop a pool. Stopping a pool that is already stopped succeeds.
    async fn stop_pool(&self, pool: &PoolHandle) -> Result<(), RegistryError>;

    /// Remove an application from the site.
    async fn remove_application(
        &self,
        site: &SiteHandle,
        app: &AppHandle,
    ) -> Result<(), RegistryError>;

    /// Remove a pool from the registry.
    async fn remove_pool(&self, pool: &PoolHandle) -> Result<(), RegistryError>;
}
