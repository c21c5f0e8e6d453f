//! Graceful Shutdown
//!
//! Runs an application until the process is asked to terminate.

use super::Application;
use crate::error::Result;
use std::future::Future;
use tokio::signal;

impl Application {
    /// Start, block until Ctrl+C or SIGTERM, then stop.
    ///
    /// Uses the start and stop timeouts from the application's configuration.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Start, wait for `signal` to complete, then stop.
    pub async fn run_until<F>(&mut self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.start(self.config().start_timeout).await?;

        signal.await;
        tracing::info!(parent: self.span(), "Initiating graceful shutdown...");

        self.stop(self.config().stop_timeout).await
    }
}

/// Create a future that completes when a shutdown signal is received
///
/// # Example
///
/// ```rust,ignore
/// use lifewire::lifecycle::shutdown_signal;
///
/// tokio::select! {
///     _ = shutdown_signal() => {
///         println!("Shutdown signal received");
///     }
///     _ = server.serve() => {}
/// }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
