use axum::Router;
use axum::routing::get;
use lifewire::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod server;

use server::{HttpServer, ServerConfig};

/// Application logger. Built only if something asks for it.
pub struct Logger {
    prefix: &'static str,
}

impl Logger {
    pub fn print(&self, message: &str) {
        tracing::info!("[{}] {}", self.prefix, message);
    }
}

/// Serves every request with a log line.
pub struct Handler {
    logger: Arc<Logger>,
}

/// The HTTP multiplexer; routes are mounted on it before the server starts.
pub struct Mux {
    server: Arc<HttpServer>,
}

fn new_logger((): ()) -> Logger {
    let logger = Logger { prefix: "demo" };
    logger.print("Executing NewLogger.");
    logger
}

fn new_handler((logger,): (Arc<Logger>,)) -> anyhow::Result<Handler> {
    logger.print("Executing NewHandler.");
    Ok(Handler { logger })
}

fn new_mux(
    (logger, config): (Arc<Logger>, Arc<ServerConfig>),
    lifecycle: &mut Lifecycle,
) -> anyhow::Result<Mux> {
    logger.print("Executing NewMux.");
    let server = Arc::new(HttpServer::new(config.addr()));

    // The server only exists because something wants the mux, so only then
    // is it started and stopped with the application.
    let (on_start, on_stop) = (Arc::clone(&server), Arc::clone(&server));
    let (start_logger, stop_logger) = (Arc::clone(&logger), logger);
    lifecycle.append(
        Hook::new("http-server")
            .on_start(move |_| {
                start_logger.print("Starting HTTP server.");
                let server = Arc::clone(&on_start);
                async move { server.listen().await }
            })
            .on_stop(move |deadline| {
                stop_logger.print("Stopping HTTP server.");
                let server = Arc::clone(&on_stop);
                async move { server.shutdown(deadline).await }
            }),
    );

    Ok(Mux { server })
}

/// Mounts the handler on the mux.
fn register((mux, handler): (Arc<Mux>, Arc<Handler>)) {
    mux.server.mount(move |router: Router| {
        let handler = Arc::clone(&handler);
        router.route(
            "/",
            get(move || {
                let handler = Arc::clone(&handler);
                async move {
                    handler.logger.print("Got a request.");
                    "ok"
                }
            }),
        )
    });
}

/// One plain HTTP/1.1 request, to show the server is up.
async fn probe(addr: &str) -> anyhow::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response.lines().next().unwrap_or_default().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = LifecycleConfig::from_env();
    let server_config = ServerConfig::from_env();
    let addr = server_config.addr();

    let mut app = Application::builder()
        .config(config)
        .supply(server_config)
        .provide(Provider::new(new_logger))
        .provide(Provider::fallible(new_handler))
        .provide(Provider::with_lifecycle(new_mux))
        .invoke(Invocation::new(register))
        .build()?;
    app.container().validate()?;

    if std::env::var_os("DEMO_SERVE").is_some() {
        app.run().await?;
        return Ok(());
    }

    app.start(config.start_timeout).await?;

    match probe(&addr).await {
        Ok(status) => tracing::info!("Probe answered: {}", status),
        Err(e) => tracing::warn!("Probe failed: {}", e),
    }

    app.stop(config.stop_timeout).await?;
    Ok(())
}
