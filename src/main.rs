mod cli;
mod handlers;

use anyhow::Result;
use neoncode::config::Config;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let filter = if args.verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = Config::load();
    tracing::debug!(config = %cfg.config_path.display(), "configuration loaded");

    match args.command {
        Command::Run(run) => handlers::run::run(run, &cfg).await,
        Command::Analyze(analyze) => handlers::analyze::run(analyze, &cfg).await,
        Command::Preview(preview) => handlers::preview::run(preview, &cfg).await,
    }
}
