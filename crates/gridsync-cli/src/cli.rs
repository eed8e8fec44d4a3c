use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gridsync",
    about = "gridsync: watch and exercise a shared, remotely synchronized grid",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    pub loglevel: Option<String>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one replica and repaint the grid in the terminal
    Watch(WatchArgs),
    /// Run several editing replicas, then check that they converge
    Demo(DemoArgs),
}

impl Command {
    pub fn replica(&self) -> &ReplicaArgs {
        match self {
            Self::Watch(args) => &args.replica,
            Self::Demo(args) => &args.replica,
        }
    }
}

/// Replica settings; each flag overrides the config file.
#[derive(Args, Clone, Debug, Default)]
pub struct ReplicaArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// id of object
    #[arg(long)]
    pub id: Option<String>,
    /// host:port of server
    #[arg(long)]
    pub host: Option<String>,
    /// requests/updates per second
    #[arg(long)]
    pub rps: Option<u32>,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
}

#[derive(Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub replica: ReplicaArgs,
    /// send updates
    #[arg(long)]
    pub send: bool,
    /// randomize the red channel of sent updates
    #[arg(long)]
    pub red: bool,
    /// randomize the green channel of sent updates
    #[arg(long)]
    pub green: bool,
    /// randomize the blue channel of sent updates
    #[arg(long)]
    pub blue: bool,
    /// Background peers editing the same object
    #[arg(long, default_value = "1")]
    pub peers: usize,
    /// Milliseconds between repaints
    #[arg(long, default_value = "500")]
    pub refresh_ms: u64,
    /// Stop after this many repaints
    #[arg(long)]
    pub frames: Option<u64>,
}

#[derive(Args)]
pub struct DemoArgs {
    #[command(flatten)]
    pub replica: ReplicaArgs,
    #[arg(long, default_value = "3")]
    pub replicas: usize,
    /// Seconds of editing before quiescing
    #[arg(long, default_value = "3")]
    pub seconds: u64,
}
