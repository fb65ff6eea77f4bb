pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use tabsync_core::error::Result;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Send { args, with_schema } => handlers::handle_send(args, with_schema).await,
        Commands::Receive { args } => handlers::handle_receive(args).await,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
