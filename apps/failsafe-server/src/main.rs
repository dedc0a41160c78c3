//! Failsafe Server - instance high-availability API.
//!
//! Serves the segments, hosts and notifications API and hands accepted
//! notifications to the recovery engine.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:15868 failsafe-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:15868` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `API_MIN_VERSION` | `1.0` | Oldest supported microversion |
//! | `API_DEFAULT_VERSION` | `1.0` | Version used when the client sends none |
//! | `API_MAX_LIMIT` | `1000` | Largest page a listing returns |
//! | `PUBLIC_ENDPOINT` | *(unset)* | Base URL for links |
//! | `DUPLICATE_NOTIFICATION_DETECTION_INTERVAL` | `180` | Seconds |
//! | `DISABLED_EXTENSIONS` | *(empty)* | Comma-separated extension aliases |

mod gateway;
mod recovery;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use failsafe_core::FailsafeConfig;
use failsafe_ha_core::notifier::DEFAULT_CHANNEL_CAPACITY;
use failsafe_ha_core::{ChannelNotifier, HaContext, build_dispatcher};
use failsafe_http::FailsafeHttpService;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::gateway::GatewayService;

/// Server version reported in health check responses.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: GatewayService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Probe the health endpoint of a running server.
///
/// Succeeds if the response is 200 OK and reports the server as running.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = FailsafeConfig::from_env().context("invalid configuration")?;

    // Handle --health-check flag for container health probes.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    let listen_addr = config.gateway_listen.clone();
    let (notifier, recovery_rx) = ChannelNotifier::new(DEFAULT_CHANNEL_CAPACITY);
    let ctx = Arc::new(HaContext::in_memory(config, Arc::new(notifier)));
    let dispatcher = build_dispatcher(&ctx).context("failed to load API extensions")?;
    let window = *dispatcher.window();

    let recovery = tokio::spawn(recovery::run(recovery_rx));

    let api = FailsafeHttpService::new(Arc::new(dispatcher));
    let gateway = GatewayService::new(api, VERSION);

    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("invalid bind address: {listen_addr}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        min_version = %window.min,
        max_version = %window.max,
        version = VERSION,
        "starting Failsafe Server",
    );

    serve(listener, gateway).await?;

    // The consumer ends once the last notifier handle is gone.
    drop(ctx);
    if let Err(e) = recovery.await {
        error!(error = %e, "recovery consumer failed");
    }
    Ok(())
}
