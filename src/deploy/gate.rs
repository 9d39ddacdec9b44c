// ABOUTME: Process-wide exclusion gate serializing registry mutations.
// ABOUTME: One shared value per process, held only around multi-call sequences.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Information about who currently holds the gate.
#[derive(Debug, Clone)]
pub struct GateInfo {
    /// Hostname of the machine holding the gate.
    pub holder: String,
    /// Process ID of the holder.
    pub pid: u32,
    /// When the gate was acquired.
    pub acquired_at: DateTime<Utc>,
    /// Deployment (pool name) on whose behalf the gate is held.
    pub owner: String,
}

impl GateInfo {
    fn new(owner: &str) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
            owner: owner.to_string(),
        }
    }
}

/// Mutual-exclusion gate shared by every orchestrator in the process.
///
/// The registry is not safe for concurrent structural mutation, so every
/// sequence of registry calls that spans more than one operation runs under
/// this gate. Cloning yields a handle to the same gate; construct one value
/// and pass it to every orchestrator rather than reaching for a global.
#[derive(Clone, Default)]
pub struct RegistryGate {
    inner: Arc<Mutex<Option<GateInfo>>>,
}

impl std::fmt::Debug for RegistryGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryGate").finish()
    }
}

impl RegistryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the gate, waiting for any current holder to release it.
    ///
    /// The returned guard releases on drop, so an early return from a failed
    /// registry sequence never leaves the gate held.
    pub async fn acquire(&self, owner: &str) -> GateGuard<'_> {
        let mut slot = self.inner.lock().await;
        let info = GateInfo::new(owner);
        tracing::debug!(owner = %info.owner, pid = info.pid, "registry gate acquired");
        *slot = Some(info);
        GateGuard { slot }
    }
}

/// Held gate; releases when dropped.
pub struct GateGuard<'a> {
    slot: MutexGuard<'a, Option<GateInfo>>,
}

impl std::fmt::Debug for GateGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateGuard").field("info", &*self.slot).finish()
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if let Some(info) = self.slot.take() {
            let held = Utc::now() - info.acquired_at;
            tracing::debug!(
                owner = %info.owner,
                held_ms = held.num_milliseconds(),
                "registry gate released"
            );
        }
    }
}
