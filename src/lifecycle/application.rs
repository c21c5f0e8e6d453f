//! Application Bootstrap
//!
//! Ties the container and the lifecycle manager together behind `start` and
//! `stop`.

use super::{ContainerState, Deadline, LifecycleManager};
use crate::config::LifecycleConfig;
use crate::di::{Container, ContainerBuilder, Invocation, Provider};
use crate::error::{LifewireError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span};
use uuid::Uuid;

/// A dependency graph plus the lifecycle of everything built from it
///
/// `start` runs every invocation (building only what they need), then the
/// OnStart hooks appended along the way. `stop` runs the OnStop hooks in
/// reverse. Both take `&mut self`, so an application is never started and
/// stopped concurrently.
///
/// # Example
///
/// ```rust,ignore
/// use lifewire::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> lifewire::Result<()> {
///     let mut app = Application::builder()
///         .provide(Provider::new(|()| Logger::new()))
///         .provide(Provider::with_lifecycle(new_mux))
///         .invoke(Invocation::new(register))
///         .build()?;
///
///     app.start(Duration::from_secs(15)).await?;
///     // ... serve ...
///     app.stop(Duration::from_secs(15)).await
/// }
/// ```
pub struct Application {
    id: Uuid,
    container: Container,
    lifecycle_manager: LifecycleManager,
    state: ContainerState,
    materialized: bool,
    config: LifecycleConfig,
    span: Span,
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn new(container: Container, config: LifecycleConfig) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            span: tracing::info_span!("app", app = %id),
            container,
            lifecycle_manager: LifecycleManager::new(),
            state: ContainerState::Built,
            materialized: false,
            config,
        }
    }

    /// Identifier attached to this application's log events
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    /// Get a reference to the container
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Get a reference to the lifecycle manager
    pub fn lifecycle_manager(&self) -> &LifecycleManager {
        &self.lifecycle_manager
    }

    /// Run every invocation now instead of at `start`.
    ///
    /// Invocations only ever run once; calling this again is a no-op. A
    /// failure is terminal: the application moves to `FailedToStart`.
    pub fn materialize(&mut self) -> Result<()> {
        let _entered = self.span.clone().entered();
        if self.materialized {
            return Ok(());
        }
        if self.state != ContainerState::Built {
            return Err(LifewireError::invalid_transition(self.state, "materialize"));
        }

        tracing::info!(
            "Running {} invocations...",
            self.container.invocations().len()
        );
        if let Err(e) = self.container.run_invocations(&mut self.lifecycle_manager) {
            tracing::error!("Failed to build the dependency graph: {}", e);
            self.teardown(ContainerState::FailedToStart);
            return Err(e);
        }
        self.materialized = true;

        tracing::info!(
            "Materialized {} instances, {} hooks appended",
            self.container.instance_count(),
            self.lifecycle_manager.hook_count()
        );
        Ok(())
    }

    /// Resolve a single type outside of any invocation.
    ///
    /// Before `start` this may construct `T` and its dependencies; afterwards
    /// only already-built instances are returned.
    pub fn resolve<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>> {
        let _entered = self.span.clone().entered();
        if self.state.is_terminal() {
            return Err(LifewireError::invalid_transition(self.state, "resolve"));
        }
        self.container
            .resolve::<T>(&mut self.lifecycle_manager, self.state)
    }

    /// Materialize the graph and run OnStart hooks before `deadline`.
    ///
    /// # Errors
    ///
    /// Any resolution or invocation error, `StartHookFailed`, or
    /// `StartTimeout`. When a hook fails, the hooks that already started
    /// are stopped in reverse order before this returns.
    pub async fn start(&mut self, deadline: impl Into<Deadline>) -> Result<()> {
        let span = self.span.clone();
        self.start_in_span(deadline.into()).instrument(span).await
    }

    async fn start_in_span(&mut self, deadline: Deadline) -> Result<()> {
        if self.state != ContainerState::Built {
            return Err(LifewireError::invalid_transition(self.state, "start"));
        }

        tracing::info!("Starting application...");
        self.materialize()?;

        self.state = ContainerState::Starting;
        if let Err(e) = self.lifecycle_manager.start(deadline).await {
            self.state = ContainerState::StoppingAfterFailure;
            self.lifecycle_manager
                .rollback(Deadline::after(self.config.stop_timeout))
                .await;
            self.teardown(ContainerState::FailedToStart);
            tracing::error!("Application failed to start: {}", e);
            return Err(e);
        }

        self.state = ContainerState::Running;
        tracing::info!("Application started");
        Ok(())
    }

    /// Run every OnStop hook in reverse order before `deadline`.
    ///
    /// All hooks are attempted even if some fail; the failures come back
    /// together as `StopFailed`. Instances and hooks are released either way.
    pub async fn stop(&mut self, deadline: impl Into<Deadline>) -> Result<()> {
        let span = self.span.clone();
        self.stop_in_span(deadline.into()).instrument(span).await
    }

    async fn stop_in_span(&mut self, deadline: Deadline) -> Result<()> {
        if self.state != ContainerState::Running {
            return Err(LifewireError::invalid_transition(self.state, "stop"));
        }

        tracing::info!("Shutting down application...");
        self.state = ContainerState::Stopping;
        let result = self.lifecycle_manager.stop(deadline).await;
        self.teardown(ContainerState::Stopped);

        match &result {
            Ok(()) => tracing::info!("Application shutdown complete"),
            Err(e) => tracing::warn!("Application stopped with errors: {}", e),
        }
        result
    }

    fn teardown(&mut self, state: ContainerState) {
        self.lifecycle_manager.clear();
        self.container.clear_instances();
        self.state = state;
    }
}

/// Builder for Application
#[derive(Default)]
pub struct ApplicationBuilder {
    container: ContainerBuilder,
    config: LifecycleConfig,
}

impl ApplicationBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an already populated container, replacing anything registered so far
    pub fn container(mut self, container: Container) -> Self {
        self.container = ContainerBuilder::from(container);
        self
    }

    pub fn provide(mut self, provider: Provider) -> Self {
        self.container = self.container.provide(provider);
        self
    }

    pub fn supply<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.container = self.container.supply(value);
        self
    }

    pub fn invoke(mut self, invocation: Invocation) -> Self {
        self.container = self.container.invoke(invocation);
        self
    }

    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the timeout `run` uses for OnStart hooks
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.config.start_timeout = timeout;
        self
    }

    /// Set the timeout for OnStop hooks, also used when rolling back a failed start
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.config.stop_timeout = timeout;
        self
    }

    /// Build the application
    ///
    /// Nothing is constructed yet; that happens on `start`.
    ///
    /// # Errors
    ///
    /// Returns the first registration error, such as `DuplicateProvider`.
    pub fn build(self) -> Result<Application> {
        let container = self.container.build()?;
        Ok(Application::new(container, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Hook, Lifecycle};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Server;

    fn timeout() -> Duration {
        Duration::from_secs(5)
    }

    fn app_with_hook(hook: impl Fn() -> Hook + Send + Sync + 'static) -> Application {
        Application::builder()
            .provide(Provider::with_lifecycle(move |(), lifecycle: &mut Lifecycle| {
                lifecycle.append(hook());
                Ok::<_, anyhow::Error>(Server)
            }))
            .invoke(Invocation::new(|(_server,): (Arc<Server>,)| {}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_then_stop() {
        let mut app = app_with_hook(|| Hook::new("server"));
        assert_eq!(app.state(), ContainerState::Built);

        app.start(timeout()).await.unwrap();
        assert_eq!(app.state(), ContainerState::Running);
        assert_eq!(app.lifecycle_manager().started_count(), 1);

        app.stop(timeout()).await.unwrap();
        assert_eq!(app.state(), ContainerState::Stopped);
        assert_eq!(app.container().instance_count(), 0);
        assert_eq!(app.lifecycle_manager().hook_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let mut app = app_with_hook(|| Hook::new("server"));

        let err = app.stop(timeout()).await.unwrap_err();
        assert!(matches!(
            err,
            LifewireError::InvalidLifecycleTransition {
                state: ContainerState::Built,
                ..
            }
        ));

        app.start(timeout()).await.unwrap();
        let err = app.start(timeout()).await.unwrap_err();
        assert!(matches!(err, LifewireError::InvalidLifecycleTransition { .. }));

        app.stop(timeout()).await.unwrap();
        assert!(app.stop(timeout()).await.is_err());
        assert!(app.resolve::<Server>().is_err());
    }

    #[tokio::test]
    async fn test_failed_start_is_terminal() {
        let stops = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&stops);
        let mut app = app_with_hook(move || {
            let counter = Arc::clone(&counter);
            Hook::new("server")
                .on_start(|_| async { Err(anyhow::anyhow!("address in use")) })
                .on_stop(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                })
        });

        let err = app.start(timeout()).await.unwrap_err();
        assert!(matches!(err, LifewireError::StartHookFailed { .. }));
        assert_eq!(app.state(), ContainerState::FailedToStart);
        // The hook that failed to start is not stopped.
        assert_eq!(stops.load(Ordering::SeqCst), 0);
        assert!(app.stop(timeout()).await.is_err());
    }

    #[tokio::test]
    async fn test_eager_materialize_and_resolve() {
        let mut app = app_with_hook(|| Hook::new("server"));

        app.materialize().unwrap();
        app.materialize().unwrap();
        assert!(app.container().is_materialized::<Server>());
        assert_eq!(app.lifecycle_manager().hook_count(), 1);

        app.start(timeout()).await.unwrap();
        assert!(app.resolve::<Server>().is_ok());
        assert!(matches!(
            app.resolve::<String>(),
            Err(LifewireError::UnknownType { .. })
        ));
        app.stop(timeout()).await.unwrap();
    }

    fn current_span_name() -> Option<&'static str> {
        Span::current().metadata().map(|m| m.name())
    }

    #[tokio::test]
    async fn test_constructors_and_hooks_log_under_app_span() {
        let _default = tracing::subscriber::set_default(tracing_subscriber::registry());
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let in_constructor = Arc::clone(&seen);

        let mut app = Application::builder()
            .provide(Provider::with_lifecycle(
                move |(), lifecycle: &mut Lifecycle| {
                    in_constructor.lock().unwrap().push(current_span_name());
                    let in_hook = Arc::clone(&in_constructor);
                    lifecycle.append(Hook::new("server").on_start(move |_| {
                        in_hook.lock().unwrap().push(current_span_name());
                        async { Ok(()) }
                    }));
                    Ok::<_, anyhow::Error>(Server)
                },
            ))
            .invoke(Invocation::new(|(_server,): (Arc<Server>,)| {}))
            .build()
            .unwrap();

        assert_eq!(current_span_name(), None);
        app.start(timeout()).await.unwrap();
        app.stop(timeout()).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Some("app"), Some("app")]);
    }

    #[test]
    fn test_builder_applies_timeouts() {
        let app = Application::builder()
            .start_timeout(Duration::from_secs(1))
            .stop_timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        assert_eq!(app.config().start_timeout, Duration::from_secs(1));
        assert_eq!(app.config().stop_timeout, Duration::from_secs(2));
        assert!(app.container().is_empty());
    }
}
