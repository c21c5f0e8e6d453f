//! Start/stop hooks contributed by constructors.

use super::Deadline;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type HookFn = Box<dyn Fn(Deadline) -> HookFuture + Send + Sync>;

/// A pair of start and stop operations.
///
/// Both default to doing nothing. OnStart hooks run in the order they were
/// appended, OnStop hooks in reverse.
///
/// # Example
///
/// ```rust,ignore
/// use lifewire::lifecycle::{Deadline, LifecycleHook};
/// use async_trait::async_trait;
///
/// #[async_trait]
/// impl LifecycleHook for ConnectionPool {
///     fn name(&self) -> &str {
///         "ConnectionPool"
///     }
///
///     async fn on_start(&self, deadline: Deadline) -> anyhow::Result<()> {
///         tokio::time::timeout(deadline.remaining(), self.connect()).await??;
///         Ok(())
///     }
///
///     async fn on_stop(&self, _deadline: Deadline) -> anyhow::Result<()> {
///         self.close().await
///     }
/// }
/// ```
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    fn name(&self) -> &str;

    async fn on_start(&self, _deadline: Deadline) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_stop(&self, _deadline: Deadline) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Closure-based [`LifecycleHook`].
///
/// ```rust
/// use lifewire::lifecycle::Hook;
///
/// let hook = Hook::new("http-server")
///     .on_start(|_deadline| async {
///         // bind and spawn the accept loop
///         Ok(())
///     })
///     .on_stop(|deadline| async move {
///         deadline.expired().await;
///         Ok(())
///     });
/// ```
pub struct Hook {
    name: String,
    on_start: Option<HookFn>,
    on_stop: Option<HookFn>,
}

impl Hook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_start: None,
            on_stop: None,
        }
    }

    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Deadline) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_start = Some(boxed(f));
        self
    }

    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Deadline) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_stop = Some(boxed(f));
        self
    }
}

fn boxed<F, Fut>(f: F) -> HookFn
where
    F: Fn(Deadline) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move |deadline| Box::pin(f(deadline)))
}

#[async_trait]
impl LifecycleHook for Hook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_start(&self, deadline: Deadline) -> anyhow::Result<()> {
        match &self.on_start {
            Some(f) => f(deadline).await,
            None => Ok(()),
        }
    }

    async fn on_stop(&self, deadline: Deadline) -> anyhow::Result<()> {
        match &self.on_stop {
            Some(f) => f(deadline).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}
