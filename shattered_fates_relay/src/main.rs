// CLI entry point for the Shattered Fates position relay.
//
// Two subcommands:
//
//   relay serve [--host H] [--port P] [--staleness-secs S] [--config FILE]
//       Run a relay server until the process is killed. Logs traffic
//       counters periodically. CLI flags override values from FILE.
//
//   relay probe --id ID [--host H] [--port P] [--x X --y Y] [--count N]
//       Join a relay as a fake player: send HELLO, then N position
//       updates, then print every remote position heard, as JSON.
//
// Logging goes through `env_logger`; set `RUST_LOG=debug` to see peers
// registering and being evicted.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use shattered_fates_protocol::{Frame, PeerId, Position};
use shattered_fates_relay::{
    DEFAULT_PORT, RelayClient, RelayServer, ServerConfig, SharedPeerTable,
};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Shattered Fates UDP position relay")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a relay server.
    Serve {
        /// JSON server config; flags below override it.
        #[arg(long)]
        config: Option<std::path::PathBuf>,

        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds of silence before a peer is dropped.
        #[arg(long)]
        staleness_secs: Option<u64>,

        /// Seconds between traffic counter log lines.
        #[arg(long, default_value_t = 10)]
        stats_secs: u64,
    },
    /// Send test traffic through a relay and print what comes back.
    Probe {
        #[arg(long)]
        id: String,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        #[arg(long, default_value_t = 100.0)]
        x: f32,

        #[arg(long, default_value_t = 200.0)]
        y: f32,

        /// Number of POS frames to send.
        #[arg(long, default_value_t = 5)]
        count: u32,

        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Args::parse().command {
        Command::Serve {
            config,
            host,
            port,
            staleness_secs,
            stats_secs,
        } => {
            let mut server_config = match config {
                Some(path) => ServerConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                server_config.host = host;
            }
            if let Some(port) = port {
                server_config.port = port;
            }
            if let Some(secs) = staleness_secs {
                server_config.staleness_threshold = Duration::from_secs(secs);
            }
            serve(server_config, Duration::from_secs(stats_secs.max(1)))
        }
        Command::Probe {
            id,
            host,
            port,
            x,
            y,
            count,
            interval_ms,
        } => probe(
            PeerId::new(id)?,
            &host,
            port,
            Position::new(x, y),
            count,
            Duration::from_millis(interval_ms),
        ),
    }
}

fn serve(config: ServerConfig, stats_interval: Duration) -> Result<()> {
    let mut server = RelayServer::new(config);
    let addr = server.start().context("starting relay server")?;
    println!("Relay listening on {addr}");

    // Runs until the process is killed; the OS reclaims the socket.
    loop {
        thread::sleep(stats_interval);
        let stats = server.stats();
        info!(
            "peers={} received={} forwarded={} failed={} evicted={}",
            server.peer_count(),
            stats.datagrams_received,
            stats.datagrams_forwarded,
            stats.forward_failures,
            stats.peers_evicted
        );
    }
}

fn probe(
    id: PeerId,
    host: &str,
    port: u16,
    start: Position,
    count: u32,
    interval: Duration,
) -> Result<()> {
    let table = SharedPeerTable::new(id.clone());
    let mut client = RelayClient::new(host, port, table.handler())
        .with_context(|| format!("resolving relay {host}:{port}"))?;
    client.start().context("starting relay client")?;

    client.send(&Frame::hello(id.clone()).to_string());
    for step in 0..count {
        let position = Position::new(start.x + step as f32, start.y);
        let frame = Frame::pos(id.clone(), position);
        info!("sending {frame}");
        client.send(&frame.to_string());
        thread::sleep(interval);
    }

    client.stop();
    let stats = client.stats();
    info!(
        "sent={} failed={} received={}",
        stats.datagrams_sent, stats.send_failures, stats.datagrams_received
    );
    println!("{}", serde_json::to_string_pretty(&table.snapshot())?);
    Ok(())
}
