// ABOUTME: One-way shutdown signal fired after host teardown completes.
// ABOUTME: Observable by any number of waiters; an output signal, not a cancel input.

use tokio::sync::watch;

/// Sender side of the shutdown signal, owned by the orchestrator.
///
/// Fires at most once. Anyone holding a [`ShutdownToken`] observing the fired
/// state may assume the endpoint has already been unregistered from the host
/// manager.
#[derive(Debug)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
    fired: bool,
}

/// Cloneable observer handle for host shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> (ShutdownSignal, ShutdownToken) {
        let (tx, rx) = watch::channel(false);
        (ShutdownSignal { tx, fired: false }, ShutdownToken { rx })
    }

    /// Fire the signal. Returns whether this call performed the transition;
    /// later calls are no-ops.
    pub fn fire(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        // Receivers may all be gone; firing is still a success.
        let _ = self.tx.send(true);
        true
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }
}

impl ShutdownToken {
    /// Whether the signal has fired.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal fires. Also resolves if the orchestrator is
    /// dropped without firing, since no shutdown can follow at that point.
    pub async fn fired(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_unfired() {
        let (signal, token) = ShutdownSignal::new();
        assert!(!signal.is_fired());
        assert!(!token.is_fired());
    }

    #[tokio::test]
    async fn fires_exactly_once() {
        let (mut signal, token) = ShutdownSignal::new();

        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(token.is_fired());
    }

    #[tokio::test]
    async fn all_clones_observe_the_fire() {
        let (mut signal, token) = ShutdownSignal::new();
        let mut observer_a = token.clone();
        let mut observer_b = token.clone();

        let waiter_a = tokio::spawn(async move { observer_a.fired().await });
        let waiter_b = tokio::spawn(async move { observer_b.fired().await });

        signal.fire();
        waiter_a.await.unwrap();
        waiter_b.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_signal_unblocks_waiters() {
        let (signal, mut token) = ShutdownSignal::new();
        drop(signal);
        token.fired().await;
    }
}
