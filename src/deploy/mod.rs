// ABOUTME: Deployment lifecycle orchestration.
// ABOUTME: Identity derivation, exclusion gate, readiness, shutdown, teardown.

mod error;
mod gate;
mod identity;
mod orchestrator;
mod readiness;
mod shutdown;

pub use error::{DeployError, TeardownFailure, TeardownReport, TeardownStep};
pub use gate::{GateGuard, GateInfo, RegistryGate};
pub use identity::{DeploymentIdentity, SITE_NAME, SITE_PORT};
pub use orchestrator::{DeploymentResult, LifecycleOrchestrator, LifecycleState};
pub use readiness::{FixedDelay, ReadinessWaiter};
pub use shutdown::{ShutdownSignal, ShutdownToken};
