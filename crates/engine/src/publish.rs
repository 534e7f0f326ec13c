//! Per-metric emission policies. Each tick kind decides on its own whether the
//! update is worth sending.

use edge_ingest_core::{CarDamage, CarMotion, CarStatus, CarTelemetry, SessionInfo};
use model::{Conditions, EnergyStatus, Event, MotionPoint, RivalDirection, TelemetryPoint, TyreWear};

use crate::{Emission, SessionContext};

/// Stationary-car noise floor, km/h.
pub const MIN_PUBLISH_SPEED_KMH: f64 = 5.0;
/// ERS store capacity, joules.
pub const ERS_CAPACITY_J: f64 = 4_000_000.0;

pub fn on_car_telemetry(ctx: &mut SessionContext, t: &CarTelemetry, out: &mut Vec<Emission>) {
    let speed_kmh = f64::from(t.speed_kmh);
    ctx.current_speed_ms = speed_kmh / 3.6;

    if ctx.max_distance_reached > 0.0 && speed_kmh > MIN_PUBLISH_SPEED_KMH {
        out.push(Emission::Publish(ctx.envelope(Event::Telemetry(TelemetryPoint {
            speed: speed_kmh,
            rpm: f64::from(t.engine_rpm),
            throttle: f64::from(t.throttle),
            brake: f64::from(t.brake),
            gear: t.gear,
            drs: t.drs,
            total_distance: ctx.max_distance_reached,
        }))));
    }
}

/// Motion packets carry no speed, so the gate uses the last telemetry reading.
pub fn on_motion(ctx: &SessionContext, m: &CarMotion, out: &mut Vec<Emission>) {
    if ctx.max_distance_reached > 0.0 && ctx.current_speed_ms * 3.6 > MIN_PUBLISH_SPEED_KMH {
        let [x, y, z] = m.world_position;
        out.push(Emission::Publish(ctx.envelope(Event::Motion(MotionPoint {
            world_x: f64::from(x),
            world_y: f64::from(y),
            world_z: f64::from(z),
            g_lateral: f64::from(m.g_force_lateral),
            g_longitudinal: f64::from(m.g_force_longitudinal),
            g_vertical: f64::from(m.g_force_vertical),
            total_distance: ctx.max_distance_reached,
        }))));
    }
}

/// Player energy/fuel every tick once moving, plus a spoken cue when the tracked
/// rival switches deploy mode.
pub fn on_car_status(ctx: &mut SessionContext, cars: &[CarStatus], player: usize, out: &mut Vec<Emission>) {
    if let Some(me) = cars.get(player) {
        if ctx.max_distance_reached > 0.0 {
            out.push(Emission::Publish(ctx.envelope(Event::Energy(EnergyStatus {
                ers_percent: ers_percent(me.ers_store_energy),
                ers_deploy_mode: me.ers_deploy_mode,
                fuel_in_tank: f64::from(me.fuel_in_tank),
                fuel_remaining_laps: f64::from(me.fuel_remaining_laps),
                total_distance: ctx.max_distance_reached,
            }))));
        }
    }

    let Some(rival) = ctx.target_rival_index.and_then(|i| cars.get(i)) else { return };
    let mode = rival.ers_deploy_mode;
    if let Some(last) = ctx.last_rival_ers_mode {
        if last != mode {
            out.push(Emission::Announce(format!(
                "{} switched to {} mode",
                side_name(ctx.target_rival_direction),
                deploy_mode_name(mode)
            )));
        }
    }
    ctx.last_rival_ers_mode = Some(mode);
}

/// Wear moves slowly; only an exact change of the vector is worth a message.
pub fn on_car_damage(ctx: &mut SessionContext, d: &CarDamage, out: &mut Vec<Emission>) {
    if ctx.last_tyre_wear == Some(d.tyres_wear) {
        return;
    }
    ctx.last_tyre_wear = Some(d.tyres_wear);
    let [rl, rr, fl, fr] = d.tyres_wear;
    out.push(Emission::Publish(ctx.envelope(Event::TyreWear(TyreWear {
        rear_left: f64::from(rl),
        rear_right: f64::from(rr),
        front_left: f64::from(fl),
        front_right: f64::from(fr),
        total_distance: ctx.max_distance_reached,
    }))));
}

pub fn on_session(ctx: &mut SessionContext, info: &SessionInfo, out: &mut Vec<Emission>) {
    let conditions = Conditions {
        weather: weather_name(info.weather).to_string(),
        track_temperature: info.track_temperature,
        air_temperature: info.air_temperature,
    };
    if ctx.last_conditions.as_ref() == Some(&conditions) {
        return;
    }
    if let Some(prev) = &ctx.last_conditions {
        if prev.weather != conditions.weather {
            out.push(Emission::Announce(format!("Weather changing to {}", conditions.weather)));
        }
    }
    out.push(Emission::Publish(ctx.envelope(Event::Conditions(conditions.clone()))));
    ctx.last_conditions = Some(conditions);
}

/// Store energy as a percentage of capacity. Garbage in gives 0, never NaN.
pub fn ers_percent(store_j: f32) -> f64 {
    let pct = f64::from(store_j) / ERS_CAPACITY_J * 100.0;
    if pct.is_finite() { pct } else { 0.0 }
}

pub fn deploy_mode_name(mode: u8) -> &'static str {
    match mode {
        0 => "none",
        1 => "medium",
        2 => "hotlap",
        3 => "overtake",
        _ => "unknown",
    }
}

pub fn weather_name(weather: u8) -> &'static str {
    match weather {
        0 => "clear",
        1 => "light cloud",
        2 => "overcast",
        3 => "light rain",
        4 => "heavy rain",
        5 => "storm",
        _ => "unknown",
    }
}

fn side_name(direction: RivalDirection) -> &'static str {
    match direction {
        RivalDirection::Ahead => "Car ahead",
        RivalDirection::Behind => "Car behind",
        RivalDirection::None => "Rival",
    }
}
