use clap::{Parser, Subcommand};

/// Queue worker and producer for the stockrelay queues.
#[derive(Debug, Parser)]
#[command(name = "stockrelay-worker", version)]
pub(crate) struct Cli {
    /// Path to stockrelay.toml (falls back to STOCKRELAY_CONFIG, then
    /// ~/.stockrelay/stockrelay.toml)
    #[arg(short = 'c', long, env = "STOCKRELAY_CONFIG", global = true)]
    pub(crate) config: Option<String>,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Drain a primary queue, logging one summary line per message
    Consume {
        #[arg(short, long)]
        queue: String,
    },
    /// Publish messages to a queue and its monitor queue
    Produce {
        #[arg(short, long)]
        queue: String,
        /// JSON object; repeat to send several in order
        #[arg(short, long = "message", required = true)]
        messages: Vec<String>,
    },
}
