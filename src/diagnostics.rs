// ABOUTME: Diagnostics accumulator for non-fatal warnings during deployment.
// ABOUTME: Collects warnings that shouldn't fail a deployment but should be shown to users.

/// Collects non-fatal warnings during deployment operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A leftover web root from a previous run was replaced.
    pub fn stale_web_root(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::StaleWebRoot,
            message: message.into(),
        }
    }

    /// The shared-root environment variable was unset.
    pub fn root_fallback(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RootFallback,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A stale published directory was found and replaced.
    StaleWebRoot,
    /// TESTDOCK_ROOT was unset; the system temp directory was used instead.
    RootFallback,
}
