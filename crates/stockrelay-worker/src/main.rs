use clap::Parser;
use stockrelay_broker::AmqpBroker;
use stockrelay_core::RelayConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod cli;
mod consume;
mod produce;
mod summary;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockrelay_worker=info,stockrelay_broker=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = RelayConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        RelayConfig::default()
    });

    match cli.command {
        Commands::Consume { queue } => {
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Ctrl-C received, stopping consumer");
                        on_ctrl_c.cancel();
                    }
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
                }
            });

            consume::run(&config.broker, &queue, cancel).await?;
            info!(queue = %queue, "consumer stopped");
        }
        Commands::Produce { queue, messages } => {
            let broker = AmqpBroker::connect_with_config(&config.broker).await?;
            let result = produce::run(&broker, &config.queues, &queue, &messages).await;
            broker.close().await;
            let sent = result?;
            info!(queue = %queue, count = sent.len(), "all messages sent");
        }
    }
    Ok(())
}
