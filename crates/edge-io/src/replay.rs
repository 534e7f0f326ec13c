use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use tokio::{
    net::UdpSocket,
    time::{sleep_until, Instant},
};
use tracing::{info, warn};

use crate::CapturedPacket;

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;
/// Progress is logged every this many packets.
pub const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    pub dest: SocketAddr,
    /// Pacing factor: 2.0 plays twice as fast. Clamped to `MIN_SPEED..=MAX_SPEED`.
    pub speed: f64,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self { dest: SocketAddr::from((Ipv4Addr::LOCALHOST, 20777)), speed: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub sent: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    } else {
        1.0
    }
}

/// Bind an ephemeral socket of the destination's family and replay through it.
pub async fn replay_to(packets: &[CapturedPacket], opts: ReplayOptions) -> io::Result<ReplayStats> {
    let local = if opts.dest.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };
    let socket = UdpSocket::bind(local).await?;
    Ok(replay(packets, &socket, opts).await)
}

/// Send every payload once, each no earlier than its capture offset (scaled by
/// the speed factor) after the start. A failed send is logged and counted.
pub async fn replay(packets: &[CapturedPacket], socket: &UdpSocket, opts: ReplayOptions) -> ReplayStats {
    let speed = clamp_speed(opts.speed);
    let total = packets.len();
    info!(total, dest = %opts.dest, speed, "replay starting");

    let start = Instant::now();
    let mut stats = ReplayStats::default();
    for (i, pkt) in packets.iter().enumerate() {
        sleep_until(start + pkt.offset.div_f64(speed)).await;

        match socket.send_to(&pkt.payload, opts.dest).await {
            Ok(_) => stats.sent += 1,
            Err(e) => {
                stats.failed += 1;
                warn!(index = i, error = %e, "send failed");
            }
        }

        if i % PROGRESS_EVERY == 0 {
            info!(packet = i, total, percent = i * 100 / total, "replay progress");
        }
    }

    stats.elapsed = start.elapsed();
    info!(sent = stats.sent, failed = stats.failed, elapsed_ms = stats.elapsed.as_millis() as u64, "replay finished");
    stats
}
