// ABOUTME: Error types for the deployment lifecycle.
// ABOUTME: Deploy errors propagate; teardown failures aggregate into a report.

use std::fmt;

use crate::host::RegistryError;

/// Errors surfaced by `deploy()`.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Required config artifacts could not be produced (bad path, missing or
    /// malformed config document, publish failure).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A host-manager call failed during deploy.
    #[error("provisioning failed: {source}")]
    Provisioning {
        #[source]
        source: RegistryError,
    },

    /// Operation not allowed in the current lifecycle state.
    #[error("{operation} is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl DeployError {
    pub(crate) fn provisioning(source: RegistryError) -> Self {
        DeployError::Provisioning { source }
    }
}

/// Teardown sub-steps, for attributing partial failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    StopPool,
    RemoveApplication,
    RemovePool,
    Commit,
    RemoveArtifacts,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TeardownStep::StopPool => "stop pool",
            TeardownStep::RemoveApplication => "remove application",
            TeardownStep::RemovePool => "remove pool",
            TeardownStep::Commit => "commit",
            TeardownStep::RemoveArtifacts => "remove artifacts",
        };
        write!(f, "{name}")
    }
}

/// One failed teardown sub-step.
#[derive(Debug)]
pub struct TeardownFailure {
    pub step: TeardownStep,
    pub message: String,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// Aggregated outcome of `dispose()`.
///
/// Teardown is best-effort: a failed sub-step never stops the remaining
/// sub-steps. Every failure is recorded here instead of being swallowed, so
/// test suites can assert on partial-failure scenarios.
#[derive(Debug, Default)]
#[must_use = "teardown failures should be checked, not dropped"]
pub struct TeardownReport {
    failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    /// Whether every teardown sub-step succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[TeardownFailure] {
        &self.failures
    }

    pub(crate) fn record(&mut self, step: TeardownStep, error: impl fmt::Display) {
        let message = error.to_string();
        tracing::warn!(step = %step, %message, "teardown sub-step failed");
        self.failures.push(TeardownFailure { step, message });
    }
}
