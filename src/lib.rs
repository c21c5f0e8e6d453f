//! # Lifewire
//!
//! A dependency injection container with an application lifecycle.
//!
//! Constructors ("providers") are registered per produced type and run
//! lazily, at most once, only when something actually needs their output.
//! Invocations are run eagerly at startup and pull the graph into existence.
//! Constructors may append start/stop hooks, which the application runs in
//! order on start and in reverse order on stop, each phase bounded by a
//! deadline.
//!
//! ## Features
//!
//! - **Static type identity**: dependencies are declared as tuples of
//!   `Arc<T>` / `Option<Arc<T>>`, no runtime reflection
//! - **Singletons**: every type is constructed once per application
//! - **Cycle detection**: with the full path in the error
//! - **Ordered hooks**: OnStart in append order, OnStop reversed
//! - **Rollback**: a failed start stops whatever already started
//! - **Resilient shutdown**: every OnStop hook runs, failures are aggregated
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lifewire::prelude::*;
//!
//! struct Logger;
//! struct Server;
//!
//! #[tokio::main]
//! async fn main() -> lifewire::Result<()> {
//!     let mut app = Application::builder()
//!         .provide(Provider::new(|()| Logger))
//!         .provide(Provider::with_lifecycle(
//!             |(_logger,): (Arc<Logger>,), lifecycle: &mut Lifecycle| {
//!                 lifecycle.append(
//!                     Hook::new("server")
//!                         .on_start(|_| async { Ok(()) })
//!                         .on_stop(|_| async { Ok(()) }),
//!                 );
//!                 Ok::<_, anyhow::Error>(Server)
//!             },
//!         ))
//!         .invoke(Invocation::new(|(_server,): (Arc<Server>,)| {}))
//!         .build()?;
//!
//!     app.start(Duration::from_secs(15)).await?;
//!     app.stop(Duration::from_secs(15)).await
//! }
//! ```

pub mod config;
pub mod di;
pub mod error;
pub mod lifecycle;

// Re-export core types
pub use config::{ConfigService, LifecycleConfig};
pub use di::{Container, ContainerBuilder, Invocation, Provider, TypeKey};
pub use error::{LifewireError, Result};
pub use lifecycle::{Application, ApplicationBuilder, ContainerState, Deadline, Hook, Lifecycle};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;

/// Prelude module for convenient imports
///
/// ```
/// use lifewire::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigService, LifecycleConfig};
    pub use crate::di::{Container, ContainerBuilder, Invocation, Provider, TypeKey};
    pub use crate::error::{LifewireError, Result};
    pub use crate::lifecycle::{
        Application, ApplicationBuilder, ContainerState, Deadline, Hook, Lifecycle, LifecycleHook,
        LifecycleManager, shutdown_signal,
    };
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
    pub use std::time::Duration;
}
