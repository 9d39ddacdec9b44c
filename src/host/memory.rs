// ABOUTME: In-process host registry used by tests and local mode.
// ABOUTME: Mutations are staged in a working copy and applied to the live table on commit.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::RegistryError;
use super::registry::HostRegistry;
use crate::types::{AppHandle, PoolHandle, PoolName, SiteHandle, VirtualPath};

/// Operations that can be armed to fail once, for exercising partial-failure
/// teardown paths in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CreatePool,
    FindOrCreateSite,
    AddApplication,
    Commit,
    StopPool,
    RemoveApplication,
    RemovePool,
}

#[derive(Debug, Clone)]
pub struct PoolRecord {
    pub runtime_version: String,
    pub is_32_bit: bool,
    pub stopped: bool,
}

#[derive(Debug, Clone)]
pub struct AppRecord {
    pub id: String,
    pub physical_path: PathBuf,
    pub pool: String,
}

#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub root_dir: PathBuf,
    pub port: u16,
    /// Applications keyed by virtual path.
    pub apps: HashMap<String, AppRecord>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    pools: HashMap<String, PoolRecord>,
    sites: HashMap<String, SiteRecord>,
}

#[derive(Default)]
struct State {
    /// Staged configuration the registry client mutates and reads back.
    work: Tables,
    /// Configuration applied to the running host, replaced on commit.
    live: Tables,
    journal: Vec<String>,
    fail_once: HashSet<FailPoint>,
}

/// In-memory registry sharing one state table between all clones.
///
/// Mutations land in a staged working copy; `commit` replaces the live table
/// with it, mirroring a host manager that only picks up configuration on
/// apply. Registry operations (including `find_application`) read the staged
/// copy, while the inspection helpers report the live table, so tests observe
/// exactly what a running host would.
///
/// Successful operations are appended to a journal so tests can assert that
/// registration sequences from concurrent deployments never interleave.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    state: Arc<Mutex<State>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the given operation to fail with a transport error exactly once.
    pub fn fail_once(&self, point: FailPoint) {
        self.state.lock().fail_once.insert(point);
    }

    /// Names of pools applied to the running host.
    pub fn pool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().live.pools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn pool(&self, name: &str) -> Option<PoolRecord> {
        self.state.lock().live.pools.get(name).cloned()
    }

    /// A pool that has been registered but not necessarily committed.
    pub fn staged_pool(&self, name: &str) -> Option<PoolRecord> {
        self.state.lock().work.pools.get(name).cloned()
    }

    pub fn site_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().live.sites.keys().cloned().collect();
        names.sort();
        names
    }

    /// Virtual paths of applications running under a site.
    pub fn application_paths(&self, site: &str) -> Vec<String> {
        let state = self.state.lock();
        let mut paths: Vec<String> = state
            .live
            .sites
            .get(site)
            .map(|s| s.apps.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// Ordered log of every successful registry operation.
    pub fn journal(&self) -> Vec<String> {
        self.state.lock().journal.clone()
    }

    fn trip(state: &mut State, point: FailPoint) -> Result<(), RegistryError> {
        if state.fail_once.remove(&point) {
            return Err(RegistryError::Transport {
                message: format!("injected failure at {point:?}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HostRegistry for MemoryRegistry {
    async fn create_pool(
        &self,
        name: &PoolName,
        runtime_version: &str,
        is_32_bit: bool,
    ) -> Result<PoolHandle, RegistryError> {
        let mut state = self.state.lock();
        Self::trip(&mut state, FailPoint::CreatePool)?;

        if state.work.pools.contains_key(name.as_str()) {
            return Err(RegistryError::AlreadyExists {
                name: name.to_string(),
            });
        }
        state.work.pools.insert(
            name.to_string(),
            PoolRecord {
                runtime_version: runtime_version.to_string(),
                is_32_bit,
                stopped: false,
            },
        );
        state.journal.push(format!("create_pool {name}"));
        Ok(PoolHandle::new(name.to_string()))
    }

    async fn find_or_create_site(
        &self,
        name: &str,
        root_dir: &Path,
        port: u16,
    ) -> Result<SiteHandle, RegistryError> {
        let mut state = self.state.lock();
        Self::trip(&mut state, FailPoint::FindOrCreateSite)?;

        if !state.work.sites.contains_key(name) {
            state.work.sites.insert(
                name.to_string(),
                SiteRecord {
                    root_dir: root_dir.to_path_buf(),
                    port,
                    apps: HashMap::new(),
                },
            );
        }
        state.journal.push(format!("find_or_create_site {name}"));
        Ok(SiteHandle::new(name.to_string()))
    }

    async fn add_application(
        &self,
        site: &SiteHandle,
        virtual_path: &VirtualPath,
        physical_path: &Path,
        pool: &PoolHandle,
    ) -> Result<AppHandle, RegistryError> {
        let mut state = self.state.lock();
        Self::trip(&mut state, FailPoint::AddApplication)?;

        if !state.work.pools.contains_key(pool.as_str()) {
            return Err(RegistryError::PoolNotFound {
                name: pool.to_string(),
            });
        }
        let site_record =
            state
                .work
                .sites
                .get_mut(site.as_str())
                .ok_or_else(|| RegistryError::SiteNotFound {
                    name: site.to_string(),
                })?;
        if site_record.apps.contains_key(virtual_path.as_str()) {
            return Err(RegistryError::AlreadyExists {
                name: virtual_path.to_string(),
            });
        }

        let id = format!("{site}{virtual_path}");
        site_record.apps.insert(
            virtual_path.as_str().to_string(),
            AppRecord {
                id: id.clone(),
                physical_path: physical_path.to_path_buf(),
                pool: pool.to_string(),
            },
        );
        state.journal.push(format!("add_application {virtual_path}"));
        Ok(AppHandle::new(id))
    }

    async fn find_application(
        &self,
        site: &SiteHandle,
        virtual_path: &VirtualPath,
    ) -> Result<Option<AppHandle>, RegistryError> {
        let state = self.state.lock();
        let site_record =
            state
                .work
                .sites
                .get(site.as_str())
                .ok_or_else(|| RegistryError::SiteNotFound {
                    name: site.to_string(),
                })?;
        Ok(site_record
            .apps
            .get(virtual_path.as_str())
            .map(|app| AppHandle::new(app.id.clone())))
    }

    async fn commit(&self) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        Self::trip(&mut state, FailPoint::Commit)?;
        state.live = state.work.clone();
        state.journal.push("commit".to_string());
        Ok(())
    }

    async fn stop_pool(&self, pool: &PoolHandle) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        Self::trip(&mut state, FailPoint::StopPool)?;

        let record = state.work.pools.get_mut(pool.as_str()).ok_or_else(|| {
            RegistryError::PoolNotFound {
                name: pool.to_string(),
            }
        })?;
        // Stopping a stopped pool is a success per the registry contract.
        record.stopped = true;
        state.journal.push(format!("stop_pool {pool}"));
        Ok(())
    }

    async fn remove_application(
        &self,
        site: &SiteHandle,
        app: &AppHandle,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        Self::trip(&mut state, FailPoint::RemoveApplication)?;

        let site_record =
            state
                .work
                .sites
                .get_mut(site.as_str())
                .ok_or_else(|| RegistryError::SiteNotFound {
                    name: site.to_string(),
                })?;
        let path = site_record
            .apps
            .iter()
            .find(|(_, record)| record.id == *app.as_str())
            .map(|(path, _)| path.clone())
            .ok_or_else(|| RegistryError::ApplicationNotFound {
                path: app.to_string(),
            })?;
        site_record.apps.remove(&path);
        state.journal.push(format!("remove_application {app}"));
        Ok(())
    }

    async fn remove_pool(&self, pool: &PoolHandle) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        Self::trip(&mut state, FailPoint::RemovePool)?;

        if state.work.pools.remove(pool.as_str()).is_none() {
            return Err(RegistryError::PoolNotFound {
                name: pool.to_string(),
            });
        }
        state.journal.push(format!("remove_pool {pool}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::error::RegistryErrorKind;

    fn pool_name(name: &str) -> PoolName {
        PoolName::new(name).unwrap()
    }

    #[tokio::test]
    async fn mutations_stay_staged_until_commit() {
        let registry = MemoryRegistry::new();
        let name = pool_name("run42");

        registry.create_pool(&name, "v4.0", false).await.unwrap();
        assert!(registry.pool_names().is_empty());
        assert!(registry.staged_pool("run42").is_some());

        registry.commit().await.unwrap();
        assert_eq!(registry.pool_names(), vec!["run42".to_string()]);
    }

    #[tokio::test]
    async fn commit_applies_removals() {
        let registry = MemoryRegistry::new();
        let name = pool_name("run42");
        let handle = registry.create_pool(&name, "v4.0", false).await.unwrap();
        registry.commit().await.unwrap();

        registry.remove_pool(&handle).await.unwrap();
        // Still running until the removal is committed.
        assert_eq!(registry.pool_names(), vec!["run42".to_string()]);

        registry.commit().await.unwrap();
        assert!(registry.pool_names().is_empty());
    }

    #[tokio::test]
    async fn create_pool_rejects_duplicates() {
        let registry = MemoryRegistry::new();
        let name = pool_name("run42");

        registry.create_pool(&name, "v4.0", false).await.unwrap();
        let err = registry
            .create_pool(&name, "v4.0", false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), RegistryErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn site_is_created_once_and_found_after() {
        let registry = MemoryRegistry::new();
        let root = Path::new("/srv/testdock");

        let first = registry
            .find_or_create_site("testdock", root, 5100)
            .await
            .unwrap();
        let second = registry
            .find_or_create_site("testdock", root, 5100)
            .await
            .unwrap();
        registry.commit().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.site_names(), vec!["testdock".to_string()]);
    }

    #[tokio::test]
    async fn stop_pool_twice_succeeds() {
        let registry = MemoryRegistry::new();
        let name = pool_name("run42");
        let handle = registry.create_pool(&name, "v4.0", false).await.unwrap();

        registry.stop_pool(&handle).await.unwrap();
        registry.stop_pool(&handle).await.unwrap();
        registry.commit().await.unwrap();
        assert!(registry.pool("run42").unwrap().stopped);
    }

    #[tokio::test]
    async fn armed_failure_fires_exactly_once() {
        let registry = MemoryRegistry::new();
        registry.fail_once(FailPoint::Commit);

        let err = registry.commit().await.unwrap_err();
        assert_eq!(err.kind(), RegistryErrorKind::Transport);
        registry.commit().await.unwrap();
    }

    #[tokio::test]
    async fn remove_application_matches_by_handle() {
        let registry = MemoryRegistry::new();
        let name = pool_name("run42");
        let pool = registry.create_pool(&name, "v4.0", false).await.unwrap();
        let site = registry
            .find_or_create_site("testdock", Path::new("/srv"), 5100)
            .await
            .unwrap();
        let vpath = VirtualPath::from_segment("run42").unwrap();
        let app = registry
            .add_application(&site, &vpath, Path::new("/srv/run42"), &pool)
            .await
            .unwrap();

        registry.remove_application(&site, &app).await.unwrap();
        registry.commit().await.unwrap();
        assert!(registry.application_paths("testdock").is_empty());
        assert!(
            registry
                .find_application(&site, &vpath)
                .await
                .unwrap()
                .is_none()
        );
    }
}
