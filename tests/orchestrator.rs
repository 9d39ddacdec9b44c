// ABOUTME: Integration tests for the deployment lifecycle orchestrator.
// ABOUTME: Exercises deploy/dispose against the in-memory host registry.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use testdock::deploy::{
    DeployError, LifecycleOrchestrator, LifecycleState, RegistryGate, SITE_NAME,
};
use testdock::host::{FailPoint, MemoryRegistry};
use testdock::params::DeploymentParameters;

/// Run an async test body with TESTDOCK_ROOT pointed at a scratch directory.
fn with_root<F, Fut>(root: &Path, f: F) -> Fut::Output
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    temp_env::with_var("TESTDOCK_ROOT", Some(root.to_str().unwrap()), || {
        tokio::runtime::Runtime::new().unwrap().block_on(f())
    })
}

/// Lay out a built artifact at `<base>/<run>/app`.
fn make_artifact(base: &Path, run: &str) -> PathBuf {
    let app = base.join(run).join("app");
    std::fs::create_dir_all(&app).unwrap();
    std::fs::write(app.join("app.dll"), b"artifact").unwrap();
    std::fs::write(app.join("web.config"), "<configuration>\n</configuration>\n").unwrap();
    app
}

fn quick_params(artifact: &Path) -> DeploymentParameters {
    let mut params = DeploymentParameters::new(artifact);
    params.warm_up = Duration::ZERO;
    params
}

#[test]
fn deploy_then_dispose_restores_registry_state() {
    let artifacts = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let app = make_artifact(artifacts.path(), "run42");

    with_root(root.path(), || async move {
        let registry = Arc::new(MemoryRegistry::new());
        let mut orchestrator = LifecycleOrchestrator::new(
            Arc::clone(&registry),
            RegistryGate::new(),
            quick_params(&app),
        );

        let result = orchestrator.deploy().await.unwrap();
        assert_eq!(orchestrator.state(), LifecycleState::Deployed);
        assert_eq!(result.application_base_uri, "http://localhost:5100/run42/");
        assert_eq!(registry.pool_names(), vec!["run42".to_string()]);
        assert_eq!(
            registry.application_paths(SITE_NAME),
            vec!["/run42".to_string()]
        );
        assert!(result.web_root.join("app.dll").is_file());
        assert!(result.web_root.join("environment.txt").is_file());

        let report = orchestrator.dispose().await;
        assert!(report.is_clean(), "failures: {:?}", report.failures());
        assert_eq!(orchestrator.state(), LifecycleState::Disposed);

        // Pool and application are gone; the shared site persists.
        assert!(registry.pool_names().is_empty());
        assert!(registry.application_paths(SITE_NAME).is_empty());
        assert_eq!(registry.site_names(), vec![SITE_NAME.to_string()]);
        assert!(!result.web_root.exists());
    });
}

#[test]
fn second_deploy_on_the_same_instance_is_rejected() {
    let artifacts = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let app = make_artifact(artifacts.path(), "run42");

    with_root(root.path(), || async move {
        let registry = Arc::new(MemoryRegistry::new());
        let mut orchestrator =
            LifecycleOrchestrator::new(registry, RegistryGate::new(), quick_params(&app));

        orchestrator.deploy().await.unwrap();
        let err = orchestrator.deploy().await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::InvalidState {
                operation: "deploy",
                ..
            }
        ));

        let report = orchestrator.dispose().await;
        assert!(report.is_clean());
    });
}

#[tokio::test]
async fn dispose_without_deploy_skips_the_registry_but_runs_hooks() {
    let registry = Arc::new(MemoryRegistry::new());
    let mut orchestrator = LifecycleOrchestrator::new(
        Arc::clone(&registry),
        RegistryGate::new(),
        quick_params(Path::new("/tmp/run42/app")),
    );

    let hook_ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&hook_ran);
    orchestrator.on_cleanup(move || flag.store(true, Ordering::SeqCst));

    let report = orchestrator.dispose().await;

    assert!(report.is_clean());
    assert!(registry.journal().is_empty(), "no registry calls expected");
    assert!(hook_ran.load(Ordering::SeqCst));
    assert!(orchestrator.shutdown_token().is_fired());
    assert_eq!(orchestrator.state(), LifecycleState::Disposed);
}

#[test]
fn shutdown_token_fires_once_and_only_after_teardown() {
    let artifacts = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let app = make_artifact(artifacts.path(), "run42");

    with_root(root.path(), || async move {
        let registry = Arc::new(MemoryRegistry::new());
        let mut orchestrator = LifecycleOrchestrator::new(
            Arc::clone(&registry),
            RegistryGate::new(),
            quick_params(&app),
        );

        let result = orchestrator.deploy().await.unwrap();
        assert!(!result.host_shutdown.is_fired());

        // A waiter observing the token must find the endpoint already
        // unregistered when it wakes.
        let observer_registry = Arc::clone(&registry);
        let mut token = result.host_shutdown.clone();
        let waiter = tokio::spawn(async move {
            token.fired().await;
            assert!(observer_registry.pool_names().is_empty());
            assert!(observer_registry.application_paths(SITE_NAME).is_empty());
        });

        let report = orchestrator.dispose().await;
        assert!(report.is_clean());
        waiter.await.unwrap();
        assert!(result.host_shutdown.is_fired());
    });
}

#[test]
fn concurrent_deployments_never_interleave_registrations() {
    let artifacts = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let app_a = make_artifact(artifacts.path(), "alpha");
    let app_b = make_artifact(artifacts.path(), "beta");

    with_root(root.path(), || async move {
        let registry = Arc::new(MemoryRegistry::new());
        let gate = RegistryGate::new();

        let mut tasks = Vec::new();
        for app in [app_a, app_b] {
            let registry = Arc::clone(&registry);
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                let mut orchestrator =
                    LifecycleOrchestrator::new(registry, gate, quick_params(&app));
                orchestrator.deploy().await.unwrap();
                orchestrator
            }));
        }

        let mut orchestrators = Vec::new();
        for task in tasks {
            orchestrators.push(task.await.unwrap());
        }

        // Each deployment's registration sequence must be contiguous in the
        // journal: pool, site, application, commit, with no foreign entries
        // in between.
        let journal = registry.journal();
        assert_eq!(journal.len(), 8, "journal: {journal:?}");
        for chunk in journal.chunks(4) {
            let pool = chunk[0]
                .strip_prefix("create_pool ")
                .unwrap_or_else(|| panic!("unexpected journal head: {chunk:?}"));
            assert_eq!(chunk[1], format!("find_or_create_site {SITE_NAME}"));
            assert_eq!(chunk[2], format!("add_application /{pool}"));
            assert_eq!(chunk[3], "commit");
        }

        let mut pools = registry.pool_names();
        pools.sort();
        assert_eq!(pools, vec!["alpha".to_string(), "beta".to_string()]);

        for mut orchestrator in orchestrators {
            let report = orchestrator.dispose().await;
            assert!(report.is_clean(), "failures: {:?}", report.failures());
        }
        assert!(registry.pool_names().is_empty());
        assert!(registry.application_paths(SITE_NAME).is_empty());
    });
}

#[test]
fn dispose_after_failed_registration_reclaims_the_pool() {
    let artifacts = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let app = make_artifact(artifacts.path(), "run42");

    with_root(root.path(), || async move {
        let registry = Arc::new(MemoryRegistry::new());
        registry.fail_once(FailPoint::AddApplication);

        let mut orchestrator = LifecycleOrchestrator::new(
            Arc::clone(&registry),
            RegistryGate::new(),
            quick_params(&app),
        );

        let err = orchestrator.deploy().await.unwrap_err();
        assert!(matches!(err, DeployError::Provisioning { .. }));
        // The pool registration was staged before the failure but never
        // committed; it still must be reclaimed.
        assert!(registry.pool_names().is_empty());
        assert!(registry.staged_pool("run42").is_some());

        let report = orchestrator.dispose().await;
        // Missing application is not a failure; the pool teardown runs.
        assert!(report.is_clean(), "failures: {:?}", report.failures());

        let journal = registry.journal();
        assert!(journal.contains(&"stop_pool run42".to_string()));
        assert!(journal.contains(&"remove_pool run42".to_string()));
        assert!(registry.staged_pool("run42").is_none());
        assert!(registry.pool_names().is_empty());
    });
}

#[test]
fn teardown_failure_is_reported_but_does_not_stop_remaining_steps() {
    let artifacts = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let app = make_artifact(artifacts.path(), "run42");

    with_root(root.path(), || async move {
        let registry = Arc::new(MemoryRegistry::new());
        let mut orchestrator = LifecycleOrchestrator::new(
            Arc::clone(&registry),
            RegistryGate::new(),
            quick_params(&app),
        );
        orchestrator.deploy().await.unwrap();

        registry.fail_once(FailPoint::StopPool);
        let report = orchestrator.dispose().await;

        assert!(!report.is_clean());
        assert_eq!(report.failures().len(), 1);
        assert_eq!(
            report.failures()[0].step,
            testdock::deploy::TeardownStep::StopPool
        );

        // Removal still ran and the token still fired.
        assert!(registry.pool_names().is_empty());
        assert!(registry.application_paths(SITE_NAME).is_empty());
        assert!(orchestrator.shutdown_token().is_fired());
    });
}

#[test]
fn repeated_dispose_is_a_no_op() {
    let artifacts = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let app = make_artifact(artifacts.path(), "run42");

    with_root(root.path(), || async move {
        let registry = Arc::new(MemoryRegistry::new());
        let mut orchestrator = LifecycleOrchestrator::new(
            Arc::clone(&registry),
            RegistryGate::new(),
            quick_params(&app),
        );
        orchestrator.deploy().await.unwrap();

        let first = orchestrator.dispose().await;
        assert!(first.is_clean());
        let journal_len = registry.journal().len();

        let second = orchestrator.dispose().await;
        assert!(second.is_clean());
        assert_eq!(registry.journal().len(), journal_len);
        assert_eq!(orchestrator.state(), LifecycleState::Disposed);
    });
}

#[test]
fn classic_variant_gets_the_pipeline_patch() {
    let artifacts = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let app = make_artifact(artifacts.path(), "run42");

    with_root(root.path(), || async move {
        let registry = Arc::new(MemoryRegistry::new());
        let mut params = quick_params(&app);
        params.server_variant = testdock::params::ServerVariant::Classic;
        params.environment = "staging".to_string();

        let mut orchestrator =
            LifecycleOrchestrator::new(registry, RegistryGate::new(), params);
        let result = orchestrator.deploy().await.unwrap();

        let config = std::fs::read_to_string(result.web_root.join("web.config")).unwrap();
        assert!(config.contains("runAllManagedModulesForAllRequests"));
        let environment =
            std::fs::read_to_string(result.web_root.join("environment.txt")).unwrap();
        assert_eq!(environment, "ENVIRONMENT=staging\n");

        let report = orchestrator.dispose().await;
        assert!(report.is_clean());
    });
}
