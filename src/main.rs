//! Edgewatch main entry point
//!
//! Hexagonal architecture with a single-consumer dispatch loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LineBus (stdin/stdout)   SystemClock   JsonlConnector         │
//! │  (BusPort)                (ClockPort)   FileHeartbeat          │
//! │                                         (Store + Heartbeat)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Normalise · Alarm · Sample · Actuate · Persist        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Reader thread ──▶ bounded ingress queue ──▶ dispatch loop     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Logs go to stderr; stdout carries the outbound bus.
#![deny(unused_must_use)]

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::SyncSender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use log::{LevelFilter, debug, info, warn};

use edgewatch::adapters::json_store::{FileHeartbeat, JsonlConnector};
use edgewatch::adapters::line_bus::{LineBus, read_lines};
use edgewatch::adapters::time::SystemClock;
use edgewatch::app::inbound::InboundMessage;
use edgewatch::app::service::AppService;
use edgewatch::config::SystemConfig;
use edgewatch::dispatch;
use edgewatch::health::{cloud_status, status_report};
use edgewatch::persistence::PersistenceSidecar;
use edgewatch::relay_emulator::RelayEmulator;

// ── CLI ───────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "edgewatch", version, about)]
struct Cli {
    /// JSON config file; environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the data manager over `<topic> <payload>` lines on stdin/stdout.
    Run {
        /// Force persistence on.
        #[arg(long, conflicts_with = "no_ddb")]
        ddb: bool,
        /// Force persistence off.
        #[arg(long)]
        no_ddb: bool,
    },
    /// Print the cloud persistence status as JSON.
    Status,
    /// Emulate the relay actuator.
    RelayEmulator,
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let mut config = SystemConfig::load(cli.config.as_deref(), |k| std::env::var(k).ok())
        .context("loading configuration")?;

    match cli.command {
        Command::Run { ddb, no_ddb } => {
            if ddb {
                config.persistence.enabled = true;
            } else if no_ddb {
                config.persistence.enabled = false;
            }
            run(config)
        }
        Command::Status => {
            let p = &config.persistence;
            let status = cloud_status(
                p.enabled,
                &p.heartbeat_path,
                Duration::from_secs(p.heartbeat_ttl_secs),
                SystemTime::now(),
            );
            println!("{}", status_report(status));
            Ok(())
        }
        Command::RelayEmulator => relay_emulator(&config),
    }
}

// ── Subcommands ───────────────────────────────────────────────

fn run(config: SystemConfig) -> Result<()> {
    info!("edgewatch v{} starting", env!("CARGO_PKG_VERSION"));
    let p = &config.persistence;
    info!(
        "Persistence {} (tables {}/{})",
        if p.enabled { "enabled" } else { "disabled" },
        p.metrics_table,
        p.alarms_table
    );

    let persistence = PersistenceSidecar::new(
        p,
        &config.source_tag,
        JsonlConnector::new(&p.data_dir),
        FileHeartbeat::new(&p.heartbeat_path),
    );
    let capacity = config.queue_capacity;
    let mut service = AppService::new(config, persistence);

    let mut bus = LineBus::new(io::stdout().lock());
    service.subscribe_all(&mut bus).context("subscribing to metric topics")?;

    let (tx, rx) = dispatch::ingress(capacity);
    let reader = spawn_reader(bus.subscriptions().to_vec(), tx)?;

    let clock = SystemClock::new();
    dispatch::drain(&rx, |msg| {
        service.handle_message(&msg, &mut bus, &clock);
    });
    join_reader(reader)?;

    let stats = service.stats();
    info!(
        "Input closed: {} processed, {} dropped, {} published ({} failed)",
        stats.processed, stats.dropped, stats.published, stats.publish_failures
    );
    Ok(())
}

fn relay_emulator(config: &SystemConfig) -> Result<()> {
    let mut relay = RelayEmulator::new(&config.topics, config.qos);
    let mut bus = LineBus::new(io::stdout().lock());
    relay.subscribe(&mut bus).context("subscribing to relay commands")?;
    info!("Relay emulator listening on {}", config.topics.relay_command);

    let (tx, rx) = dispatch::ingress(config.queue_capacity);
    let reader = spawn_reader(bus.subscriptions().to_vec(), tx)?;

    let clock = SystemClock::new();
    dispatch::drain(&rx, |msg| {
        relay.handle_message(&msg, &mut bus, &clock);
    });
    join_reader(reader)?;
    info!("Relay emulator stopped ({})", relay.state());
    Ok(())
}

// ── Reader thread ─────────────────────────────────────────────

fn spawn_reader(
    filters: Vec<String>,
    tx: SyncSender<InboundMessage>,
) -> Result<JoinHandle<io::Result<u64>>> {
    thread::Builder::new()
        .name("bus-reader".into())
        .spawn(move || read_lines(io::stdin().lock(), &filters, &tx))
        .context("spawning bus reader")
}

fn join_reader(reader: JoinHandle<io::Result<u64>>) -> Result<()> {
    match reader.join() {
        Ok(Ok(forwarded)) => {
            debug!("Bus reader forwarded {forwarded} messages");
            Ok(())
        }
        Ok(Err(e)) => {
            warn!("Bus reader stopped on I/O error: {e}");
            Ok(())
        }
        Err(_) => Err(anyhow!("bus reader panicked")),
    }
}
