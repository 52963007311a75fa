use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod app;
mod history;
mod http;
mod ingress;
mod monitor;
mod relay;
mod supervisor;
mod ws;

/// Relay between RabbitMQ queues and the inventory dashboards.
#[derive(Debug, Parser)]
#[command(name = "stockrelay-gateway", version)]
struct Args {
    /// Path to stockrelay.toml (falls back to STOCKRELAY_CONFIG, then
    /// ~/.stockrelay/stockrelay.toml)
    #[arg(long, env = "STOCKRELAY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stockrelay_gateway=info,stockrelay_broker=info,tower_http=debug".into()
            }),
        )
        .init();

    let args = Args::parse();
    let config =
        stockrelay_core::RelayConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
            warn!("Config load failed ({}), using defaults", e);
            stockrelay_core::RelayConfig::default()
        });

    let addr = format!("{}:{}", config.gateway.bind, config.gateway.port);
    let shutdown = CancellationToken::new();
    let state = Arc::new(app::AppState::new(config, shutdown.clone()));
    let router = app::build_router(state.clone());

    // broker supervisor: connects, runs monitors, reconnects; fatal on exhausted retries
    let supervisor = {
        let state = state.clone();
        tokio::spawn(async move {
            let connector = supervisor::AmqpConnector::new(state.config.broker.clone());
            let result = supervisor::run(state.clone(), connector).await;
            if let Err(e) = &result {
                error!(code = e.code(), error = %e, "broker supervisor failed, shutting down");
                state.shutdown.cancel();
            }
            result
        })
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let queues: Vec<&str> = state.config.queue_names().collect();
    info!(addr = %addr, queues = ?queues, "stockrelay gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    supervisor.await??;
    info!("stockrelay gateway stopped");
    Ok(())
}

/// Resolves on Ctrl-C, SIGTERM, or an internal shutdown request.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = terminate => info!("SIGTERM received"),
        _ = token.cancelled() => {}
    }
    token.cancel();
}
