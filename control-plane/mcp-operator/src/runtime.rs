use std::net::SocketAddr;

use kube::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::OperatorConfig, controller::run_controller, web::run_http_server,
};

/// Compute the HTTP bind address based on config.
pub fn compute_http_addr(cfg: &OperatorConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

/// Spawn the Kubernetes controller loop.
pub fn spawn_controller(
    client: Client,
    cfg: OperatorConfig,
    token: CancellationToken,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_controller(client, cfg, token).await })
}

/// Spawn the health endpoint server.
pub fn spawn_http(
    addr: SocketAddr,
    token: CancellationToken,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_http_server(addr, token).await })
}

/// Cancel `token` on SIGINT or SIGTERM.
pub fn spawn_signal_handler(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        token.cancel();
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Start controller and health server; when either stops, stop the other.
pub async fn run_all(client: Client, cfg: OperatorConfig) -> anyhow::Result<()> {
    let token = CancellationToken::new();
    let http_addr = compute_http_addr(&cfg);

    let signals = spawn_signal_handler(token.clone());
    let mut controller = spawn_controller(client, cfg, token.clone());
    let mut http = spawn_http(http_addr, token.clone());

    let (c_res, h_res) = tokio::select! {
        c = &mut controller => {
            token.cancel();
            (c, http.await)
        }
        h = &mut http => {
            token.cancel();
            (controller.await, h)
        }
    };
    signals.abort();
    c_res??;
    h_res??;
    info!("MCP operator stopped");
    Ok(())
}
