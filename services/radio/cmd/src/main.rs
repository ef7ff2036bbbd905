//! Radio link demo node.
//!
//! Runs two radio nodes over a simulated air medium. Each node is split into a
//! driving task that ticks the radio controller and an issuing task that posts
//! requests and dispatches results. The local node sends one payload to the
//! peer and the run ends once the transfer resolves or the run time expires.

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use radio_link::sim::SimAir;
use radio_link::{RadioBuilder, RadioController, RadioDriver};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod logging;
mod node;

use config::NodeConfig;
use logging::RadioLogFormatter;
use node::{Node, NodeCommand, NodeEvent};

/// Radio link demo over a simulated medium
#[derive(Parser, Debug)]
#[command(name = "resonant-radio", version, about = "Radio link demo over a simulated medium")]
struct Args {
    /// Configuration file path
    #[arg(long, default_value = "radio.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Radio preset (lora_telemetry, fsk_bulk), overrides the config file
    #[arg(long)]
    preset: Option<String>,

    /// Controller tick interval, e.g. 5ms
    #[arg(long)]
    tick: Option<humantime::Duration>,

    /// Give up after this long, e.g. 3s
    #[arg(long, default_value = "3s")]
    run_for: humantime::Duration,

    /// Payload size in bytes; above 239 the payload is sent in chunks
    #[arg(long, default_value_t = 1000)]
    payload_size: usize,

    /// Ask the peer to acknowledge
    #[arg(long)]
    ack: bool,
}

/// Outcome of one demo run
#[derive(Debug, Default, PartialEq)]
struct RunSummary {
    sent: bool,
    delivered: bool,
    intact: bool,
    errors: usize,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("info")
        .add_directive(format!("resonant_radio={}", args.log_level).parse()?)
        .add_directive(format!("radio_link={}", args.log_level).parse()?)
        .add_directive(format!("radio_wire={}", args.log_level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .event_format(RadioLogFormatter::new())
        .init();

    info!("Starting resonant radio node v{}", env!("CARGO_PKG_VERSION"));

    let mut config = NodeConfig::load_from_file(&args.config)?;
    if let Some(preset) = &args.preset {
        config.set_preset(preset)?;
    }
    if let Some(tick) = args.tick {
        config.tick_interval = tick.into();
    }

    let summary = run(&config, args.payload_size, args.ack, args.run_for.into()).await?;
    info!(
        "Run finished: sent={}, delivered={}, intact={}, errors={}",
        summary.sent, summary.delivered, summary.intact, summary.errors
    );

    if !(summary.sent && summary.delivered && summary.intact) {
        anyhow::bail!("payload was not delivered intact");
    }
    Ok(())
}

async fn run(
    config: &NodeConfig,
    payload_size: usize,
    ack_requested: bool,
    run_for: Duration,
) -> anyhow::Result<RunSummary> {
    let air = SimAir::new();
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown) = watch::channel(false);

    let local = RadioBuilder::new(config.device_id)
        .config(config.radio.clone())
        .transmission_count(config.transmission_count)
        .session_timeout(config.session_timeout)
        .build(air.radio())
        .context("failed to bring up local radio")?;
    let peer = RadioBuilder::new(config.peer_id)
        .config(config.radio.clone())
        .session_timeout(config.session_timeout)
        .build(air.radio())
        .context("failed to bring up peer radio")?;

    let local = Node::spawn(local, config.tick_interval, events_tx.clone(), shutdown.clone());
    let peer = Node::spawn(peer, config.tick_interval, events_tx, shutdown);

    peer.command(NodeCommand::StartReceive(Duration::ZERO));
    // give the peer's driving loop a few ticks to open its receiver
    tokio::time::sleep(config.tick_interval * 4).await;

    let payload = demo_payload(payload_size);
    info!(
        "Sending {} bytes from {} to {} ({} chunks)",
        payload.len(),
        local.id,
        peer.id,
        radio_wire::chunk_count(payload.len()).max(1)
    );
    local.command(NodeCommand::Send {
        payload: payload.clone(),
        destination: peer.id,
        ack_requested,
    });

    let mut summary = RunSummary::default();
    let deadline = tokio::time::sleep(run_for);
    tokio::pin!(deadline);

    while !(summary.sent && summary.delivered) {
        tokio::select! {
            _ = &mut deadline => {
                warn!("Run time of {:?} expired", run_for);
                break;
            }
            event = events.recv() => match event {
                Some(event) => record(&mut summary, event, &payload),
                None => break,
            },
        }
    }

    let _ = shutdown_tx.send(true);
    let (controller, transmissions) = local.join().await?;
    report(&controller, transmissions);
    peer.join().await?;

    Ok(summary)
}

fn record(summary: &mut RunSummary, event: NodeEvent, expected: &Bytes) {
    match event {
        NodeEvent::Sent { node, outcome } => {
            component_info!(
                "node",
                "{} transmit complete: success={}, {} bytes in {} frames",
                node,
                outcome.success,
                outcome.bytes_sent,
                outcome.chunk_count
            );
            summary.sent = true;
        }
        NodeEvent::Received { node, payload } => {
            component_info!(
                "node",
                "{} received {} bytes from {} (rssi {} dBm, snr {} dB)",
                node,
                payload.payload.len(),
                payload.source_id,
                payload.rssi,
                payload.snr
            );
            summary.delivered = true;
            summary.intact = payload.payload == *expected;
        }
        NodeEvent::Failed { node, error } => {
            component_warn!("node", "{} error {}: {}", node, error.code(), error);
            summary.errors += 1;
        }
        NodeEvent::Rejected { node, command } => {
            component_warn!("node", "{} rejected {}", node, command);
        }
    }
}

fn report<D: RadioDriver>(controller: &RadioController<D>, transmissions: u64) {
    info!(
        "Node {} stopped with {} transmissions on record",
        controller.device_id(),
        transmissions
    );
}

fn demo_payload(size: usize) -> Bytes {
    (0..size).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
}
