// ABOUTME: Lifecycle orchestrator: publish, register, wait, and tear down.
// ABOUTME: Single-use per deployment; registry mutations run under the shared gate.

use std::path::PathBuf;
use std::sync::Arc;

use super::error::{DeployError, TeardownReport, TeardownStep};
use super::gate::RegistryGate;
use super::identity::{DeploymentIdentity, SITE_NAME};
use super::readiness::{FixedDelay, ReadinessWaiter};
use super::shutdown::{ShutdownSignal, ShutdownToken};
use crate::diagnostics::Diagnostics;
use crate::host::HostRegistry;
use crate::params::DeploymentParameters;
use crate::types::{AppHandle, PoolHandle, SiteHandle};
use crate::{publish, webconfig};

/// Outcome of a successful deploy, alive for the test session.
#[derive(Debug, Clone)]
pub struct DeploymentResult {
    /// Where the artifact was published.
    pub web_root: PathBuf,
    /// Echo of the caller's parameters.
    pub parameters: DeploymentParameters,
    /// `http://localhost:{port}{virtual_path}/`
    pub application_base_uri: String,
    /// Fires once host teardown has completed.
    pub host_shutdown: ShutdownToken,
}

/// Explicit lifecycle state with guarded transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Deploying,
    Deployed,
    Disposing,
    Disposed,
}

impl LifecycleState {
    fn name(self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Deploying => "deploying",
            LifecycleState::Deployed => "deployed",
            LifecycleState::Disposing => "disposing",
            LifecycleState::Disposed => "disposed",
        }
    }
}

/// Registry handles retained between deploy and dispose.
///
/// Invariant: every `Some` field has a live entry in the host registry. The
/// site is shared between deployments and never owned by one of them.
#[derive(Debug, Default)]
struct RegisteredResources {
    pool: Option<PoolHandle>,
    site: Option<SiteHandle>,
    app: Option<AppHandle>,
}

/// Orchestrates one deployment: deploy, then dispose, never reusable.
///
/// Many orchestrators may run concurrently against one registry; they must
/// all share the same [`RegistryGate`] so structural registry mutations never
/// interleave. Publishing, config writing, and the warm-up wait run outside
/// the gate and overlap freely across deployments.
pub struct LifecycleOrchestrator<R: HostRegistry> {
    registry: Arc<R>,
    gate: RegistryGate,
    params: DeploymentParameters,
    waiter: Box<dyn ReadinessWaiter>,
    state: LifecycleState,
    identity: Option<DeploymentIdentity>,
    web_root: Option<PathBuf>,
    resources: RegisteredResources,
    shutdown: ShutdownSignal,
    token: ShutdownToken,
    cleanup_hooks: Vec<Box<dyn FnOnce() + Send>>,
    diagnostics: Diagnostics,
}

impl<R: HostRegistry> LifecycleOrchestrator<R> {
    pub fn new(registry: Arc<R>, gate: RegistryGate, params: DeploymentParameters) -> Self {
        let (shutdown, token) = ShutdownSignal::new();
        let waiter = Box::new(FixedDelay::new(params.warm_up));
        Self {
            registry,
            gate,
            params,
            waiter,
            state: LifecycleState::Created,
            identity: None,
            web_root: None,
            resources: RegisteredResources::default(),
            shutdown,
            token,
            cleanup_hooks: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Replace the readiness policy (defaults to a fixed warm-up sleep).
    pub fn set_readiness_waiter(&mut self, waiter: Box<dyn ReadinessWaiter>) {
        self.waiter = waiter;
    }

    /// Register a hook to run during dispose, after artifact removal. Hooks
    /// run exactly once, in registration order.
    pub fn on_cleanup(&mut self, hook: impl FnOnce() + Send + 'static) {
        self.cleanup_hooks.push(Box::new(hook));
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Token observable by any number of waiters; fires during dispose.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.token.clone()
    }

    /// Non-fatal warnings collected so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Provision the hosting environment and start the application.
    ///
    /// Publishing and config writing happen before the gate; only the
    /// registry mutations (pool, site, application, commit) are serialized.
    /// A failed deploy leaves any already-registered resources in place for
    /// the caller to reclaim via [`dispose`](Self::dispose).
    pub async fn deploy(&mut self) -> Result<DeploymentResult, DeployError> {
        if self.state != LifecycleState::Created {
            return Err(DeployError::InvalidState {
                operation: "deploy",
                state: self.state.name(),
            });
        }
        self.state = LifecycleState::Deploying;

        let identity = DeploymentIdentity::derive(&self.params.application_path)?;
        tracing::info!(
            pool = %identity.pool_name,
            path = %identity.virtual_path,
            "deploying artifact"
        );

        let web_root = publish::publish(
            &self.params.application_path,
            &identity,
            &mut self.diagnostics,
        )
        .await?;
        self.web_root = Some(web_root.clone());

        webconfig::write_environment_file(&web_root, &self.params.environment).await?;
        if self.params.server_variant.requires_pipeline_patch() {
            webconfig::enable_managed_pipeline(&web_root).await?;
        }

        self.identity = Some(identity.clone());

        {
            let _gate = self.gate.acquire(identity.pool_name.as_str()).await;

            let pool = self
                .registry
                .create_pool(
                    &identity.pool_name,
                    &self.params.runtime_version,
                    self.params.architecture.is_32_bit(),
                )
                .await
                .map_err(DeployError::provisioning)?;
            self.resources.pool = Some(pool.clone());

            let site = self
                .registry
                .find_or_create_site(SITE_NAME, &publish::shared_root(), identity.port)
                .await
                .map_err(DeployError::provisioning)?;
            self.resources.site = Some(site.clone());

            let app = self
                .registry
                .add_application(&site, &identity.virtual_path, &web_root, &pool)
                .await
                .map_err(DeployError::provisioning)?;
            self.resources.app = Some(app);

            self.registry
                .commit()
                .await
                .map_err(DeployError::provisioning)?;
        }

        let base_uri = identity.base_uri();
        self.waiter.wait(&base_uri).await;

        self.state = LifecycleState::Deployed;
        tracing::info!(%base_uri, "deployment ready");

        Ok(DeploymentResult {
            web_root,
            parameters: self.params.clone(),
            application_base_uri: base_uri,
            host_shutdown: self.token.clone(),
        })
    }

    /// Reverse everything deploy performed, best-effort.
    ///
    /// Valid from any state, including after a mid-deploy failure; terminal
    /// regardless of sub-step outcomes. When nothing was registered, no
    /// registry calls are made but artifact cleanup and hooks still run. The
    /// shutdown token fires strictly after host teardown, so waiters may
    /// assume the endpoint is already unregistered.
    pub async fn dispose(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.state == LifecycleState::Disposed {
            return report;
        }
        self.state = LifecycleState::Disposing;

        let pool = self.resources.pool.take();
        let site = self.resources.site.take();
        let app = self.resources.app.take();

        if let Some(pool) = pool {
            let owner = self
                .identity
                .as_ref()
                .map(|i| i.pool_name.to_string())
                .unwrap_or_else(|| pool.to_string());
            let _gate = self.gate.acquire(&owner).await;

            if let Err(e) = self.registry.stop_pool(&pool).await {
                report.record(TeardownStep::StopPool, e);
            }

            if let Some(site) = site {
                // Locate the application by its path when no handle was
                // retained (registration failed mid-deploy).
                let app = match (app, self.identity.as_ref()) {
                    (Some(app), _) => Some(app),
                    (None, Some(identity)) => {
                        match self
                            .registry
                            .find_application(&site, &identity.virtual_path)
                            .await
                        {
                            Ok(found) => found,
                            Err(e) => {
                                report.record(TeardownStep::RemoveApplication, e);
                                None
                            }
                        }
                    }
                    (None, None) => None,
                };

                if let Some(app) = app {
                    if let Err(e) = self.registry.remove_application(&site, &app).await {
                        report.record(TeardownStep::RemoveApplication, e);
                    }
                } else {
                    tracing::debug!("no application registered, nothing to remove");
                }
            }

            if let Err(e) = self.registry.remove_pool(&pool).await {
                report.record(TeardownStep::RemovePool, e);
            }
            if let Err(e) = self.registry.commit().await {
                report.record(TeardownStep::Commit, e);
            }
        }

        // Host teardown is done (or was never needed); waiters may now
        // safely assume the endpoint is unregistered.
        self.shutdown.fire();

        if let Some(web_root) = self.web_root.take() {
            if let Err(e) = publish::unpublish(&web_root).await {
                report.record(TeardownStep::RemoveArtifacts, e);
            }
        }

        for hook in self.cleanup_hooks.drain(..) {
            hook();
        }

        self.state = LifecycleState::Disposed;
        tracing::info!(clean = report.is_clean(), "deployment disposed");
        report
    }
}
