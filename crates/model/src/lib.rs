use serde::{Deserialize, Serialize};

/// Topic every derived event is published under.
pub const TOPIC: &str = "f1/telemetry";

/// One outbound message. `driver_name` carries the session label so downstream
/// consumers can split runs without any other state.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Envelope {
    pub driver_name: String,
    pub source_port: u16,
    #[serde(flatten)]
    pub event: Event,
}

impl Envelope {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted(SessionStarted),
    Telemetry(TelemetryPoint),
    Motion(MotionPoint),
    Energy(EnergyStatus),
    TyreWear(TyreWear),
    Sector(SectorTime),
    LapCompleted(LapCompleted),
    Rival(RivalUpdate),
    Conditions(Conditions),
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Session identifier changed.
    Hard,
    /// Distance regressed without an identifier change (time-trial restart).
    Soft,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SessionStarted {
    pub ordinal: u32,
    pub boundary: BoundaryKind,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TelemetryPoint {
    pub speed: f64, // km/h
    pub rpm: f64,
    pub throttle: f64, // 0..1
    pub brake: f64,    // 0..1
    pub gear: i8,
    pub drs: bool,
    pub total_distance: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MotionPoint {
    pub world_x: f64,
    pub world_y: f64,
    pub world_z: f64,
    pub g_lateral: f64,
    pub g_longitudinal: f64,
    pub g_vertical: f64,
    pub total_distance: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct EnergyStatus {
    pub ers_percent: f64,
    pub ers_deploy_mode: u8,
    pub fuel_in_tank: f64, // kg
    pub fuel_remaining_laps: f64,
    pub total_distance: f64,
}

/// Wear in percent, wheel order as reported by the game.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TyreWear {
    pub rear_left: f64,
    pub rear_right: f64,
    pub front_left: f64,
    pub front_right: f64,
    pub total_distance: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SectorTime {
    pub sector: u8,
    pub time_s: f64,
    pub lap: u32,
    pub total_distance: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct LapCompleted {
    pub lap: u32,
    pub lap_time_s: f64,
    pub sector1_s: f64,
    pub sector2_s: f64,
    pub sector3_s: f64,
    pub total_distance: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RivalDirection {
    Ahead,
    Behind,
    #[default]
    None,
}

/// Tracked rival changed. `rival_index` is `None` once the target is lost.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RivalUpdate {
    pub rival_index: Option<u8>,
    pub direction: RivalDirection,
    pub gap_s: Option<f64>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Conditions {
    pub weather: String,
    pub track_temperature: i8,
    pub air_temperature: i8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn envelope_is_flat_and_tagged() {
        let env = Envelope {
            driver_name: "Max_S1".into(),
            source_port: 20777,
            event: Event::Sector(SectorTime { sector: 1, time_s: 18.5, lap: 1, total_distance: 1200.0 }),
        };
        let v: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "sector");
        assert_eq!(v["driver_name"], "Max_S1");
        assert_eq!(v["source_port"], 20777);
        assert_eq!(v["time_s"], 18.5);
        assert_eq!(v["total_distance"], 1200.0);
    }

    #[test]
    fn rival_direction_serializes_snake_case() {
        let env = Envelope {
            driver_name: "x".into(),
            source_port: 1,
            event: Event::Rival(RivalUpdate { rival_index: Some(4), direction: RivalDirection::Ahead, gap_s: Some(1.5) }),
        };
        let s = env.to_json().unwrap();
        assert!(s.contains("\"direction\":\"ahead\""));
        let back: Envelope = serde_json::from_str(&s).unwrap();
        assert_eq!(back, env);
    }
}
