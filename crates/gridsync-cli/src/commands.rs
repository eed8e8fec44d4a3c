use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use gridsync_client::{
    Cell, ChannelMask, ClientConfig, ConsistencyHasher, Digest, GridClient, GridStore,
    InMemoryHub, InMemoryTransport, SyncPhase, SyncStats,
};
use serde::Serialize;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

use crate::cli::*;
use crate::render;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";
const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const QUIESCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the effective config: defaults, then the config file, then flags.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let args = cli.command.replica();
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClientConfig::default(),
    };

    if let Some(id) = &args.id {
        config.object_id = id.clone();
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(rps) = args.rps {
        config.rps = rps;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(level) = &cli.loglevel {
        config.log_level = level.clone();
    }
    if let Command::Watch(watch) = &cli.command {
        config.send |= watch.send;
        if watch.red || watch.green || watch.blue {
            config.keep = ChannelMask::new(watch.red, watch.green, watch.blue);
        }
    }

    config.validate()?;
    Ok(config)
}

pub async fn run_command(cli: Cli, config: ClientConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Watch(args) => cmd_watch(args, config, cli.format).await,
        Command::Demo(args) => cmd_demo(args, config, cli.format).await,
    }
}

/// Mask for the `index`-th editing peer: red, green, blue, red, ...
fn peer_mask(index: usize) -> ChannelMask {
    match index % 3 {
        0 => ChannelMask::new(true, false, false),
        1 => ChannelMask::new(false, true, false),
        _ => ChannelMask::new(false, false, true),
    }
}

fn editing_replica(hub: &Arc<InMemoryHub>, base: &ClientConfig, index: usize) -> anyhow::Result<GridClient> {
    let config = ClientConfig { send: true, keep: peer_mask(index), ..base.clone() };
    let transport = Arc::new(InMemoryTransport::new(Arc::clone(hub)));
    Ok(GridClient::new(config, transport)?)
}

/// Digest of the hub's current state laid over a black grid.
fn authoritative_digest(hub: &InMemoryHub, config: &ClientConfig) -> anyhow::Result<Digest> {
    let store = GridStore::with_default(config.bounds(), Cell::BLACK);
    for entry in hub.properties(&config.object_id)? {
        if let Ok(Some((coord, cell))) = entry.decode_for(&config.object_id) {
            store.set(coord, cell);
        }
    }
    Ok(ConsistencyHasher::digest(&store))
}

async fn wait_live(clients: &[GridClient]) -> anyhow::Result<()> {
    let deadline = Instant::now() + STARTUP_TIMEOUT;
    while !clients.iter().all(|c| c.phase() == SyncPhase::Live) {
        if Instant::now() >= deadline {
            anyhow::bail!("replicas did not go live within {:?}", STARTUP_TIMEOUT);
        }
        sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

async fn cmd_watch(args: WatchArgs, config: ClientConfig, format: OutputFormat) -> anyhow::Result<()> {
    let hub = Arc::new(InMemoryHub::new());
    let client = GridClient::new(config.clone(), Arc::new(InMemoryTransport::new(Arc::clone(&hub))))?;
    let peers = (0..args.peers)
        .map(|i| editing_replica(&hub, &config, i))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let _peer_handles: Vec<_> = peers.iter().map(GridClient::spawn).collect();
    let _handle = client.spawn();

    let columns = render::cell_columns(config.cell_size);
    let mut ticker = interval(Duration::from_millis(args.refresh_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frames = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if !client.readiness().is_ready_to_draw() {
                    continue;
                }
                let stats = client.stats();
                match format {
                    OutputFormat::Text => print!(
                        "{CLEAR_SCREEN}{}\n{}\n{}",
                        render::title(config.keep.label(), &config.object_id, &stats),
                        render::paint_grid(&client.snapshot(), config.bounds(), columns),
                        render::stats_panel(&stats),
                    ),
                    OutputFormat::Json => println!("{}", serde_json::to_string(&stats)?),
                }
                frames += 1;
                if args.frames.is_some_and(|limit| frames >= limit) {
                    break;
                }
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ReplicaReport {
    replica: usize,
    keep: &'static str,
    digest: Digest,
    stats: SyncStats,
}

#[derive(Serialize)]
struct DemoReport {
    object_id: String,
    authoritative: Digest,
    converged: bool,
    replicas: Vec<ReplicaReport>,
}

async fn cmd_demo(args: DemoArgs, config: ClientConfig, format: OutputFormat) -> anyhow::Result<()> {
    if args.replicas == 0 {
        anyhow::bail!("--replicas must be at least 1");
    }
    let hub = Arc::new(InMemoryHub::new());
    let clients = (0..args.replicas)
        .map(|i| editing_replica(&hub, &config, i))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut handles: Vec<_> = clients.iter().map(GridClient::spawn).collect();

    wait_live(&clients).await?;
    sleep(Duration::from_secs(args.seconds)).await;
    for handle in &mut handles {
        handle.stop_editing();
    }

    let deadline = Instant::now() + QUIESCE_TIMEOUT;
    let authoritative = loop {
        let expected = authoritative_digest(&hub, &config)?;
        if clients.iter().all(|c| c.digest() == expected) || Instant::now() >= deadline {
            break expected;
        }
        sleep(Duration::from_millis(20)).await;
    };

    let replicas: Vec<ReplicaReport> = clients
        .iter()
        .enumerate()
        .map(|(replica, client)| ReplicaReport {
            replica,
            keep: client.config().keep.label(),
            digest: client.digest(),
            stats: client.stats(),
        })
        .collect();
    let report = DemoReport {
        object_id: config.object_id.clone(),
        authoritative,
        converged: replicas.iter().all(|r| r.digest == authoritative),
        replicas,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("Object {} ({} changes)", report.object_id.bold(), hub.change_count(&report.object_id));
            for r in &report.replicas {
                println!(
                    "  replica {} [{:<5}] digest {}  sent {}  confirmed {}  conflicts {}",
                    r.replica,
                    r.keep,
                    r.digest.to_string().cyan(),
                    r.stats.sends,
                    r.stats.total_confirmations,
                    r.stats.conflicts,
                );
            }
            if report.converged {
                println!("{} All replicas converged on {}", "✓".green().bold(), authoritative);
            } else {
                println!("{} Replicas diverged from {}", "✗".red().bold(), authoritative);
            }
        }
    }

    if !report.converged {
        anyhow::bail!("replicas did not converge");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "gridsync", "watch", "--id", "board", "--host", "10.1.1.1:7000", "--send", "--green", "--rps", "25",
            "--loglevel", "debug",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.object_id, "board");
        assert_eq!(config.host, "10.1.1.1:7000");
        assert!(config.send);
        assert_eq!(config.keep, ChannelMask::new(false, true, false));
        assert_eq!(config.rps, 25);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn demo_keeps_default_config() {
        let cli = Cli::parse_from(["gridsync", "demo", "--replicas", "2"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let cli = Cli::parse_from(["gridsync", "watch", "--width", "0"]);
        assert!(resolve_config(&cli).is_err());
    }

    #[test]
    fn peers_cycle_through_channels() {
        assert_eq!(peer_mask(0).label(), "red");
        assert_eq!(peer_mask(1).label(), "green");
        assert_eq!(peer_mask(2).label(), "blue");
        assert_eq!(peer_mask(3).label(), "red");
    }

    #[test]
    fn authoritative_digest_overlays_hub_state() {
        let hub = InMemoryHub::new();
        let config = ClientConfig { width: 2, height: 2, ..ClientConfig::default() };
        hub.put(&config.object_id, "0-0", vec![120, 0, 0, 255]);
        hub.put(&config.object_id, "1-1", vec![30, 0, 0, 255]);
        assert_eq!(authoritative_digest(&hub, &config).unwrap(), Digest(150));
    }
}
