// ABOUTME: Readiness policy applied after the registry commit.
// ABOUTME: Default is a fixed warm-up sleep, not an active health probe.

use async_trait::async_trait;
use std::time::Duration;

/// Policy for waiting until a freshly registered endpoint is usable.
///
/// Isolated behind a trait so the fixed delay can later become a real
/// health-check poll without touching the orchestrator.
#[async_trait]
pub trait ReadinessWaiter: Send + Sync {
    async fn wait(&self, base_uri: &str);
}

/// Sleep a constant warm-up interval and assume the host manager has finished
/// activating the application. This is an accepted approximation: nothing
/// verifies the endpoint actually answers.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl ReadinessWaiter for FixedDelay {
    async fn wait(&self, base_uri: &str) {
        tracing::debug!(%base_uri, delay_ms = self.delay.as_millis() as u64, "warm-up wait");
        tokio::time::sleep(self.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        let waiter = FixedDelay::new(Duration::ZERO);
        waiter.wait("http://localhost:5100/run42/").await;
    }

    #[test]
    fn default_warm_up_is_one_second() {
        assert_eq!(FixedDelay::default().delay, Duration::from_secs(1));
    }
}
