// ABOUTME: Entry point for the testdock CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use testdock::deploy::{DeploymentIdentity, LifecycleOrchestrator, RegistryGate};
use testdock::error::{Error, Result};
use testdock::host::{HostRegistry, HttpRegistry, MemoryRegistry};
use testdock::params::{DeploymentParameters, PARAMS_FILENAME};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Deploy {
            artifact,
            config,
            environment,
            registry,
            local,
        } => {
            let mut params = load_params(artifact, config)?;
            if let Some(environment) = environment {
                params.environment = environment;
            }
            if registry.is_some() {
                params.registry_endpoint = registry;
            }

            let endpoint = if local {
                None
            } else {
                params.registry_endpoint.clone()
            };
            match endpoint {
                Some(endpoint) => deploy(Arc::new(HttpRegistry::new(endpoint)), params).await,
                None => deploy(Arc::new(MemoryRegistry::new()), params).await,
            }
        }
        Commands::Identity { artifact } => {
            let identity =
                DeploymentIdentity::derive(&artifact).map_err(|e| Error::Deploy(e.to_string()))?;
            println!("pool: {}", identity.pool_name);
            println!("path: {}", identity.virtual_path);
            println!("uri:  {}", identity.base_uri());
            Ok(())
        }
    }
}

/// Resolve deployment parameters from the CLI arguments.
///
/// An explicit `--config` file wins; otherwise a `testdock.yml` in the
/// current directory is picked up when present. A bare artifact path with no
/// parameters file gets all defaults. The artifact argument, when given,
/// always overrides the configured application path.
fn load_params(
    artifact: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<DeploymentParameters> {
    let file = config.or_else(|| {
        let default = Path::new(PARAMS_FILENAME);
        default.is_file().then(|| default.to_path_buf())
    });

    match (file, artifact) {
        (Some(file), artifact) => {
            let mut params = DeploymentParameters::from_file(&file)?;
            if let Some(artifact) = artifact {
                params.application_path = artifact;
            }
            Ok(params)
        }
        (None, Some(artifact)) => Ok(DeploymentParameters::new(artifact)),
        (None, None) => Err(Error::ParamsNotFound(PathBuf::from(PARAMS_FILENAME))),
    }
}

/// Deploy one artifact and hold it until ctrl-c.
async fn deploy<R: HostRegistry>(registry: Arc<R>, params: DeploymentParameters) -> Result<()> {
    let gate = RegistryGate::new();
    let mut orchestrator = LifecycleOrchestrator::new(registry, gate, params);

    let result = match orchestrator.deploy().await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Deploy failed: {e}");
            // Reclaim anything that was registered before the failure.
            let report = orchestrator.dispose().await;
            for failure in report.failures() {
                eprintln!("  cleanup: {failure}");
            }
            return Err(Error::Deploy(e.to_string()));
        }
    };

    println!("Deployed: {}", result.application_base_uri);
    println!("Web root: {}", result.web_root.display());
    println!("Press ctrl-c to tear down");

    tokio::signal::ctrl_c().await?;

    let report = orchestrator.dispose().await;
    if report.is_clean() {
        println!("Teardown complete");
        Ok(())
    } else {
        for failure in report.failures() {
            eprintln!("  teardown: {failure}");
        }
        Err(Error::Deploy("teardown finished with failures".to_string()))
    }
}
