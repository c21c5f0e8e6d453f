//! Lifecycle Hooks Module
//!
//! Start/stop management for everything built by the container.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Provider / invocation registration
//!    ↓
//! 2. start(): invocations run in registration order
//!    ↓         constructors run lazily, appending hooks
//! 3. OnStart hooks, in append order     ← a failure here stops the
//!    ↓                                    already-started hooks in reverse
//! [Running...]
//!    ↓
//! 4. stop(): OnStop hooks, reverse order, every hook attempted
//!    ↓
//! 5. Instances and hooks released
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lifewire::lifecycle::{Hook, Lifecycle};
//! use lifewire::di::Provider;
//!
//! let mux = Provider::with_lifecycle(|(logger,): (Arc<Logger>,), lifecycle: &mut Lifecycle| {
//!     let server = Server::new(":8080");
//!     lifecycle.append(
//!         Hook::new("http-server")
//!             .on_start({ let server = server.clone(); move |_| server.clone().listen() })
//!             .on_stop({ let server = server.clone(); move |deadline| server.clone().shutdown(deadline) }),
//!     );
//!     Ok::<_, anyhow::Error>(server.mux())
//! });
//! ```

mod application;
mod deadline;
mod hook;
mod manager;
mod shutdown;
mod state;

pub use application::{Application, ApplicationBuilder};
pub use deadline::Deadline;
pub use hook::{Hook, LifecycleHook};
pub use manager::{Lifecycle, LifecycleManager};
pub use shutdown::shutdown_signal;
pub use state::ContainerState;
