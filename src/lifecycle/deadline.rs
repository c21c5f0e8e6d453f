//! Cooperative deadlines handed to lifecycle hooks.

use std::time::Duration;
use tokio::time::Instant;

/// Hooks never run past this far out, however large the requested timeout.
const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// The point in time by which a lifecycle phase must finish.
///
/// Hooks receive the deadline of the phase they run in. Observing it is up to
/// the hook: the orchestrator stops waiting once it passes but never aborts
/// the hook's work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        let timeout = timeout.min(MAX_TIMEOUT);
        Self {
            at: Instant::now() + timeout,
            timeout,
        }
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    /// The budget the deadline was created with.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Completes once the deadline has passed.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.at).await;
    }
}

impl From<Duration> for Deadline {
    fn from(timeout: Duration) -> Self {
        Self::after(timeout)
    }
}
