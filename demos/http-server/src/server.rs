use axum::Router;
use lifewire::prelude::*;
use std::sync::{Mutex, PoisonError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Where the demo listens, from `HOST` / `PORT`.
pub struct ServerConfig {
    host: String,
    port: u16,
}

const DEFAULT_PORT: u16 = 8080;

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_config(&ConfigService::from_env())
    }

    pub fn from_config(config: &ConfigService) -> Self {
        Self {
            host: config
                .get("HOST")
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: config.get("PORT").map_or(DEFAULT_PORT, |raw| {
                raw.trim().parse().unwrap_or_else(|e| {
                    tracing::warn!("Ignoring PORT={:?}: {}", raw, e);
                    DEFAULT_PORT
                })
            }),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// An axum server whose routes are collected before it starts.
pub struct HttpServer {
    addr: String,
    router: Mutex<Router>,
    running: Mutex<Option<Running>>,
}

impl HttpServer {
    pub fn new(addr: String) -> Self {
        Self {
            addr,
            router: Mutex::new(Router::new()),
            running: Mutex::new(None),
        }
    }

    /// Add routes. Only routes mounted before `listen` are served.
    pub fn mount(&self, mount: impl FnOnce(Router) -> Router) {
        let mut router = self.router.lock().unwrap_or_else(PoisonError::into_inner);
        let current = std::mem::replace(&mut *router, Router::new());
        *router = mount(current);
    }

    /// Bind, then serve in the background.
    pub async fn listen(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        let router = self
            .router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        tracing::info!("Listening on http://{}", self.addr);
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Running { shutdown, task });
        Ok(())
    }

    /// Stop accepting connections and wait for in-flight ones until `deadline`.
    pub async fn shutdown(&self, deadline: Deadline) -> anyhow::Result<()> {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Running { shutdown, task }) = running else {
            return Ok(());
        };

        let _ = shutdown.send(());
        tokio::time::timeout_at(deadline.at(), task)
            .await
            .map_err(|_| anyhow::anyhow!("server did not drain before the deadline"))???;
        Ok(())
    }
}
