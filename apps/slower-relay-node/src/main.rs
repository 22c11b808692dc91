use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use slower_relay::{RelayConfig, RelayRuntime};
use slower_transport::{resolve_endpoint, TransportAdapter, UdpAdapter, UdpAdapterConfig};
use tracing::{error, info, warn};

mod config;

use crate::config::RelayNodeConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Caching, flooding relay for slower publications", long_about = None)]
struct Cli {
    /// Path to configuration file (.toml/.json/.yaml, or a .env file)
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Local UDP address to listen on, overriding configuration
    #[arg(long, short)]
    bind: Option<SocketAddr>,
    /// Peer relays as host[:port]; listed before any configured relays
    #[arg(value_name = "RELAYS")]
    relays: Vec<String>,
}

/// Command-line peers first, then configured ones, blanks dropped.
fn peer_entries(cli_relays: &[String], configured: &[String]) -> Vec<String> {
    cli_relays
        .iter()
        .chain(configured)
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Resolves every peer entry, skipping ones that fail. Duplicate addresses are kept once.
fn resolve_peers(entries: &[String], default_port: u16) -> Vec<SocketAddr> {
    let mut peers: Vec<SocketAddr> = Vec::with_capacity(entries.len());
    for entry in entries {
        match resolve_endpoint(entry, default_port) {
            Ok(addr) if peers.contains(&addr) => {
                warn!(relay = %entry, addr = %addr, "duplicate peer relay ignored");
            }
            Ok(addr) => {
                info!(relay = %entry, addr = %addr, "added peer relay");
                peers.push(addr);
            }
            Err(err) => {
                warn!(relay = %entry, error = %err, "skipping unresolvable peer relay");
            }
        }
    }
    peers
}

fn main() {
    let filter = std::env::var("SLOWER_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let config = match RelayNodeConfig::new(cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err}");
            std::process::exit(1);
        }
    };

    let bind = cli.bind.unwrap_or(config.bind);
    let peers = resolve_peers(
        &peer_entries(&cli.relays, &config.relays),
        config.default_port,
    );

    let adapter = match UdpAdapter::bind(
        UdpAdapterConfig::new(bind).with_poll_interval(config.poll_interval),
    ) {
        Ok(adapter) => adapter,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        if let Err(err) = flag::register(signal, Arc::clone(&shutdown)) {
            warn!(signal, error = %err, "failed to install signal handler");
        }
    }

    info!(
        bind = %bind,
        peers = peers.len(),
        poll_ms = config.poll_interval.as_millis() as u64,
        "slower relay starting"
    );

    let mut runtime = RelayRuntime::new(
        adapter,
        peers,
        RelayConfig {
            report_latency: config.report_latency,
        },
    );
    let stats = runtime.run(&shutdown);
    let health = runtime.adapter().health_snapshot();

    info!(
        inbound = stats.inbound_messages,
        malformed = stats.malformed_messages,
        publishes = stats.publishes,
        duplicates = stats.duplicate_publishes,
        peer_forwards = stats.peer_forwards,
        subscriber_forwards = stats.subscriber_forwards,
        replayed = stats.replayed_messages,
        send_errors = stats.send_errors,
        "relay stats"
    );
    info!(
        send_ok = health.outbound_send_ok,
        send_err = health.outbound_send_err,
        received = health.inbound_received,
        dropped = health.inbound_dropped,
        last_error = health.last_error.as_deref().unwrap_or("none"),
        "transport health"
    );
}
