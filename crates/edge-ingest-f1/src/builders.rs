//! Packet builders producing valid F1 23/24 datagrams. Used by the tests of this
//! crate and the listener, and handy for feeding a listener by hand.
//!
//! Cars not supplied are zero-filled.

use crate::packets::*;
use edge_ingest_core::{CarDamage, CarLap, CarMotion, CarStatus, CarTelemetry, SessionInfo, MAX_CARS};

pub fn header(format: u16, packet_id: u8, session_uid: u64, player_index: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE);
    buf.extend_from_slice(&format.to_le_bytes());
    buf.push((format % 100) as u8); // gameYear
    buf.extend_from_slice(&[1, 0, 1]); // major, minor, packetVersion
    buf.push(packet_id);
    buf.extend_from_slice(&session_uid.to_le_bytes());
    buf.extend_from_slice(&0.0f32.to_le_bytes()); // sessionTime
    buf.extend_from_slice(&0u32.to_le_bytes()); // frameIdentifier
    buf.extend_from_slice(&0u32.to_le_bytes()); // overallFrameIdentifier
    buf.push(player_index);
    buf.push(255); // secondaryPlayerCarIndex
    buf
}

/// Appends one entry per car, each padded to `entry` bytes.
fn put_cars<T>(buf: &mut Vec<u8>, cars: &[T], entry: usize, mut put: impl FnMut(&mut Vec<u8>, &T)) {
    for i in 0..MAX_CARS {
        let start = buf.len();
        if let Some(car) = cars.get(i) {
            put(buf, car);
        }
        buf.resize(start + entry, 0);
    }
}

pub fn lap_data(format: u16, session_uid: u64, player_index: u8, cars: &[CarLap]) -> Vec<u8> {
    let layout = match Layout::for_format(format) {
        Ok(layout) => layout,
        Err(_) => return header(format, PACKET_LAP_DATA, session_uid, player_index),
    };
    let mut buf = header(format, PACKET_LAP_DATA, session_uid, player_index);
    put_cars(&mut buf, cars, layout.lap_entry_size, |b, lap| {
        b.extend_from_slice(&lap.last_lap_time_ms.to_le_bytes());
        b.extend_from_slice(&lap.current_lap_time_ms.to_le_bytes());
        put_split_time(b, lap.sector1_time_ms);
        put_split_time(b, lap.sector2_time_ms);
        b.extend(std::iter::repeat(0u8).take(layout.delta_block));
        b.extend_from_slice(&lap.lap_distance.to_le_bytes());
        b.extend_from_slice(&lap.total_distance.to_le_bytes());
        b.extend_from_slice(&0.0f32.to_le_bytes()); // safetyCarDelta
        b.push(lap.car_position);
        b.push(lap.current_lap_num);
        b.extend_from_slice(&[0, 0]); // pitStatus, numPitStops
        b.push(lap.sector);
    });
    buf.extend_from_slice(&[255, 255]); // timeTrialPBCarIdx, timeTrialRivalCarIdx
    buf
}

pub fn car_telemetry(format: u16, session_uid: u64, player_index: u8, cars: &[CarTelemetry]) -> Vec<u8> {
    let mut buf = header(format, PACKET_CAR_TELEMETRY, session_uid, player_index);
    put_cars(&mut buf, cars, CAR_TELEMETRY_ENTRY_SIZE, |b, t| {
        b.extend_from_slice(&t.speed_kmh.to_le_bytes());
        b.extend_from_slice(&t.throttle.to_le_bytes());
        b.extend_from_slice(&t.steer.to_le_bytes());
        b.extend_from_slice(&t.brake.to_le_bytes());
        b.push(0); // clutch
        b.push(t.gear as u8);
        b.extend_from_slice(&t.engine_rpm.to_le_bytes());
        b.push(u8::from(t.drs));
    });
    buf.extend_from_slice(&[255, 255, 0]); // mfdPanelIndex x2, suggestedGear
    buf
}

pub fn car_status(format: u16, session_uid: u64, player_index: u8, cars: &[CarStatus]) -> Vec<u8> {
    let mut buf = header(format, PACKET_CAR_STATUS, session_uid, player_index);
    put_cars(&mut buf, cars, CAR_STATUS_ENTRY_SIZE, |b, s| {
        b.extend_from_slice(&[0; 5]);
        b.extend_from_slice(&s.fuel_in_tank.to_le_bytes());
        b.extend_from_slice(&110.0f32.to_le_bytes()); // fuelCapacity
        b.extend_from_slice(&s.fuel_remaining_laps.to_le_bytes());
        b.extend_from_slice(&[0; 20]);
        b.extend_from_slice(&s.ers_store_energy.to_le_bytes());
        b.push(s.ers_deploy_mode);
    });
    buf
}

pub fn car_damage(format: u16, session_uid: u64, player_index: u8, cars: &[CarDamage]) -> Vec<u8> {
    let mut buf = header(format, PACKET_CAR_DAMAGE, session_uid, player_index);
    put_cars(&mut buf, cars, CAR_DAMAGE_ENTRY_SIZE, |b, d| {
        for wear in d.tyres_wear {
            b.extend_from_slice(&wear.to_le_bytes());
        }
    });
    buf
}

pub fn motion(format: u16, session_uid: u64, player_index: u8, cars: &[CarMotion]) -> Vec<u8> {
    let mut buf = header(format, PACKET_MOTION, session_uid, player_index);
    put_cars(&mut buf, cars, MOTION_ENTRY_SIZE, |b, m| {
        for v in m.world_position {
            b.extend_from_slice(&v.to_le_bytes());
        }
        b.extend_from_slice(&[0; 24]); // velocity + direction vectors
        for v in [m.g_force_lateral, m.g_force_longitudinal, m.g_force_vertical, m.yaw, m.pitch, m.roll] {
            b.extend_from_slice(&v.to_le_bytes());
        }
    });
    buf
}

pub fn session(format: u16, session_uid: u64, info: &SessionInfo) -> Vec<u8> {
    let mut buf = header(format, PACKET_SESSION, session_uid, 0);
    buf.push(info.weather);
    buf.push(info.track_temperature as u8);
    buf.push(info.air_temperature as u8);
    buf.push(info.total_laps);
    buf.extend_from_slice(&info.track_length.to_le_bytes());
    buf.push(info.session_type);
    buf.push(info.track_id as u8);
    buf
}

fn put_split_time(b: &mut Vec<u8>, ms: u32) {
    b.extend_from_slice(&((ms % 60_000) as u16).to_le_bytes());
    b.push((ms / 60_000) as u8);
}
