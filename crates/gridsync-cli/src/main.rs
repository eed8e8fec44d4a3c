use anyhow::Context;
use clap::Parser;

mod cli;
mod commands;
mod render;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = commands::resolve_config(&cli)?;

    let level: tracing::Level = config
        .log_level
        .parse()
        .with_context(|| format!("invalid log level {:?}", config.log_level))?;
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    commands::run_command(cli, config).await
}
