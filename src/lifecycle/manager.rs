//! Lifecycle Manager
//!
//! Collects the hooks appended during construction and runs them as ordered,
//! deadline-bounded start and stop phases.

use super::{Deadline, LifecycleHook};
use crate::error::{LifewireError, Result};
use std::sync::Arc;
use strum_macros::Display;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, Display)]
enum Phase {
    #[strum(serialize = "OnStart")]
    Start,
    #[strum(serialize = "OnStop")]
    Stop,
}

/// A hook together with the constructor that appended it
struct RegisteredHook {
    hook: Arc<dyn LifecycleHook>,
    owner: String,
}

impl RegisteredHook {
    fn name(&self) -> &str {
        self.hook.name()
    }
}

/// Capability handed to a constructor for appending lifecycle hooks.
///
/// Hooks appended here join the application's hook sequence once the
/// constructor returns successfully, in the order they were appended.
pub struct Lifecycle {
    owner: String,
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl Lifecycle {
    pub(crate) fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            hooks: Vec::new(),
        }
    }

    pub fn append<H: LifecycleHook + 'static>(&mut self, hook: H) -> &mut Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn append_shared(&mut self, hook: Arc<dyn LifecycleHook>) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    /// Name of the constructor this handle was given to
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

/// Manages lifecycle hooks for one application
///
/// The LifecycleManager is responsible for:
/// - Keeping hooks in the order their constructors appended them
/// - Running OnStart hooks in that order, and OnStop hooks in reverse
/// - Tracking which hooks started, so only those are stopped
///
/// Every hook runs as its own tokio task. When a deadline passes the manager
/// stops waiting and reports a timeout, but the task is left running.
///
/// # Example
///
/// ```rust,ignore
/// use lifewire::lifecycle::{Deadline, Hook, LifecycleManager};
/// use std::time::Duration;
///
/// let mut manager = LifecycleManager::new();
/// manager.append(Hook::new("database"), "main");
///
/// manager.start(Deadline::after(Duration::from_secs(15))).await?;
/// // ... application runs ...
/// manager.stop(Deadline::after(Duration::from_secs(15))).await?;
/// ```
#[derive(Default)]
pub struct LifecycleManager {
    hooks: Vec<RegisteredHook>,
    started: usize,
}

impl LifecycleManager {
    /// Create a new LifecycleManager
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook directly, outside of any constructor
    pub fn append<H: LifecycleHook + 'static>(&mut self, hook: H, owner: impl Into<String>) {
        self.push(Arc::new(hook), owner.into());
    }

    pub(crate) fn append_from(&mut self, lifecycle: Lifecycle) {
        let Lifecycle { owner, hooks } = lifecycle;
        for hook in hooks {
            self.push(hook, owner.clone());
        }
    }

    fn push(&mut self, hook: Arc<dyn LifecycleHook>, owner: String) {
        tracing::debug!(hook = hook.name(), owner = %owner, "Hook appended");
        self.hooks.push(RegisteredHook { hook, owner });
    }

    /// Execute all OnStart hooks
    ///
    /// Hooks are executed in the order they were appended. Execution stops at
    /// the first failure or timeout; hooks that already started stay started
    /// until [`rollback`](Self::rollback) or [`stop`](Self::stop).
    pub async fn start(&mut self, deadline: Deadline) -> Result<()> {
        tracing::info!("Calling OnStart hooks...");

        while self.started < self.hooks.len() {
            let entry = &self.hooks[self.started];
            tracing::debug!(owner = %entry.owner, "Starting: {}", entry.name());
            run_hook(entry, Phase::Start, deadline).await.inspect_err(|e| {
                tracing::error!("OnStart failed for {}: {}", entry.name(), e);
            })?;
            tracing::debug!("Started: {}", entry.name());
            self.started += 1;
        }

        tracing::info!("OnStart complete ({} hooks executed)", self.started);
        Ok(())
    }

    /// Undo a partial start
    ///
    /// Runs the OnStop hook of every hook that started, in reverse order.
    /// Failures are logged and otherwise ignored.
    pub async fn rollback(&mut self, deadline: Deadline) {
        tracing::warn!("Rolling back {} started hooks...", self.started);

        for entry in self.hooks[..self.started].iter().rev() {
            if let Err(e) = run_hook(entry, Phase::Stop, deadline).await {
                tracing::warn!("Rollback OnStop failed for {}: {}", entry.name(), e);
            }
        }
        self.started = 0;

        tracing::info!("Rollback complete");
    }

    /// Execute OnStop hooks of every started hook
    ///
    /// Hooks are executed in **reverse order**. A failing or timed-out hook
    /// does not prevent the remaining ones from running; all failures are
    /// returned together as `StopFailed`.
    pub async fn stop(&mut self, deadline: Deadline) -> Result<()> {
        tracing::info!("Calling OnStop hooks...");

        let mut errors = Vec::new();
        for entry in self.hooks[..self.started].iter().rev() {
            tracing::debug!(owner = %entry.owner, "Stopping: {}", entry.name());
            match run_hook(entry, Phase::Stop, deadline).await {
                Ok(()) => tracing::debug!("Stopped: {}", entry.name()),
                // Log error but continue with other hooks
                Err(e) => {
                    tracing::error!("OnStop failed for {}: {}", entry.name(), e);
                    errors.push(e);
                }
            }
        }

        tracing::info!(
            "OnStop complete ({} hooks executed, {} failed)",
            self.started,
            errors.len()
        );
        self.started = 0;

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LifewireError::StopFailed { errors })
        }
    }

    /// Get the number of appended hooks
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Get the number of hooks whose OnStart succeeded and have not been stopped
    pub fn started_count(&self) -> usize {
        self.started
    }

    pub(crate) fn clear(&mut self) {
        self.hooks.clear();
        self.started = 0;
    }
}

async fn run_hook(entry: &RegisteredHook, phase: Phase, deadline: Deadline) -> Result<()> {
    let hook = Arc::clone(&entry.hook);
    let task = tokio::spawn(
        async move {
            match phase {
                Phase::Start => hook.on_start(deadline).await,
                Phase::Stop => hook.on_stop(deadline).await,
            }
        }
        .instrument(tracing::Span::current()),
    );

    let name = entry.name().to_string();
    let joined = if deadline.is_expired() {
        // Past the deadline a hook still gets one turn, so one that completes
        // without waiting reports its own result.
        tokio::task::yield_now().await;
        if task.is_finished() {
            Some(task.await)
        } else {
            None
        }
    } else {
        tokio::time::timeout_at(deadline.at(), task).await.ok()
    };

    let outcome = match joined {
        // Dropping the join handle detaches the task; it keeps running.
        None => {
            return Err(match phase {
                Phase::Start => LifewireError::StartTimeout {
                    hook: name,
                    timeout: deadline.timeout(),
                },
                Phase::Stop => LifewireError::StopTimeout {
                    hook: name,
                    timeout: deadline.timeout(),
                },
            });
        }
        Some(Err(join_error)) => Err(anyhow::anyhow!("{} hook panicked: {}", phase, join_error)),
        Some(Ok(result)) => result,
    };

    outcome.map_err(|source| match phase {
        Phase::Start => LifewireError::StartHookFailed { hook: name, source },
        Phase::Stop => LifewireError::StopHookFailed { hook: name, source },
    })
}
