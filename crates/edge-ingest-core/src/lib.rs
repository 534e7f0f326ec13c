//! Decoded tick types and the source trait shared by the decoder and the listener

use serde::{Serialize, Deserialize};

/// Upper bound on the field size; race positions run 1..=MAX_CARS.
pub const MAX_CARS: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickKind {
    Motion,
    Session,
    LapData,
    CarTelemetry,
    CarStatus,
    CarDamage,
}

/// One decoded packet. Per-car payloads are indexed by vehicle slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub session_uid: u64,
    pub player_index: u8,
    pub frame: u32,
    pub session_time_s: f32,
    pub payload: TickPayload,
}

impl Tick {
    pub fn kind(&self) -> TickKind {
        match self.payload {
            TickPayload::Motion(_) => TickKind::Motion,
            TickPayload::Session(_) => TickKind::Session,
            TickPayload::LapData(_) => TickKind::LapData,
            TickPayload::CarTelemetry(_) => TickKind::CarTelemetry,
            TickPayload::CarStatus(_) => TickKind::CarStatus,
            TickPayload::CarDamage(_) => TickKind::CarDamage,
        }
    }

    pub fn player_slot(&self) -> usize {
        usize::from(self.player_index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TickPayload {
    Motion(Vec<CarMotion>),
    Session(SessionInfo),
    LapData(Vec<CarLap>),
    CarTelemetry(Vec<CarTelemetry>),
    CarStatus(Vec<CarStatus>),
    CarDamage(Vec<CarDamage>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarMotion {
    pub world_position: [f32; 3], // metres
    pub g_force_lateral: f32,
    pub g_force_longitudinal: f32,
    pub g_force_vertical: f32,
    pub yaw: f32,   // radians
    pub pitch: f32, // radians
    pub roll: f32,  // radians
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub weather: u8,
    pub track_temperature: i8,
    pub air_temperature: i8,
    pub total_laps: u8,
    pub track_length: u16,
    pub session_type: u8,
    pub track_id: i8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarLap {
    pub last_lap_time_ms: u32,
    pub current_lap_time_ms: u32,
    /// Sector times with the minutes part already folded in; 0 while unset.
    pub sector1_time_ms: u32,
    pub sector2_time_ms: u32,
    pub lap_distance: f32,
    /// Cumulative distance since the session start, metres. Negative before the line.
    pub total_distance: f32,
    /// Race position, 0 when the slot is unused.
    pub car_position: u8,
    pub current_lap_num: u8,
    pub sector: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarTelemetry {
    pub speed_kmh: u16,
    pub throttle: f32, // 0..1
    pub steer: f32,    // -1..1
    pub brake: f32,    // 0..1
    pub gear: i8,      // -1 reverse, 0 neutral
    pub engine_rpm: u16,
    pub drs: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarStatus {
    pub fuel_in_tank: f32, // kg
    pub fuel_remaining_laps: f32,
    pub ers_store_energy: f32, // joules
    pub ers_deploy_mode: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarDamage {
    /// Wear percentage [RL, RR, FL, FR].
    pub tyres_wear: [f32; 4],
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("packet too short: {len} bytes (need {need})")]
    Truncated { len: usize, need: usize },
    #[error("unsupported packet format {0}")]
    UnsupportedFormat(u16),
    #[error("player car index {0} out of range")]
    PlayerIndex(u8),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TickTx = crossbeam_channel::Sender<Tick>;
pub type TickRx = crossbeam_channel::Receiver<Tick>;

/// Trait for any live source of decoded ticks
#[async_trait::async_trait]
pub trait TickSource: Send + Sync {
    async fn run(&self, tx: TickTx) -> Result<(), IngestError>;
}

pub fn channel() -> (TickTx, TickRx) {
    crossbeam_channel::unbounded()
}
