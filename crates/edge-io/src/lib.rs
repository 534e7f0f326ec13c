//! Offline capture handling: read UDP payloads out of a classic pcap file and
//! send them again with the recorded pacing.

pub mod capture;
pub mod replay;

pub use capture::{read_file, Capture, CaptureError, CapturedPacket};
pub use replay::{clamp_speed, replay, replay_to, ReplayOptions, ReplayStats, MAX_SPEED, MIN_SPEED};
