//! edge-replay - send a recorded F1 UDP capture back to a listener in real time.

use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use edge_io::{ReplayOptions, MAX_SPEED, MIN_SPEED};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "edge-replay", version, about = "Replay a pcap capture of game telemetry over UDP")]
struct Cli {
    /// Classic pcap file (tcpdump/Wireshark "pcap", not "pcapng")
    capture: PathBuf,

    /// Where to send the payloads
    #[arg(long, default_value = "127.0.0.1:20777")]
    dest: SocketAddr,

    /// Pacing factor, 0.1 to 10
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let speed = edge_io::clamp_speed(cli.speed);
    if speed != cli.speed {
        warn!(requested = cli.speed, using = speed, min = MIN_SPEED, max = MAX_SPEED, "speed out of range");
    }

    let capture = edge_io::read_file(&cli.capture).with_context(|| format!("reading {}", cli.capture.display()))?;
    if capture.packets.is_empty() {
        warn!(records = capture.records, "capture holds no UDP payloads");
        return Ok(());
    }
    info!(
        file = %cli.capture.display(),
        packets = capture.packets.len(),
        skipped = capture.skipped,
        "capture loaded"
    );

    let stats = edge_io::replay_to(&capture.packets, ReplayOptions { dest: cli.dest, speed })
        .await
        .context("binding replay socket")?;
    info!(sent = stats.sent, failed = stats.failed, "replay complete");
    Ok(())
}
