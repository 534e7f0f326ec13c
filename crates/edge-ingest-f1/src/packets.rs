//! Binary layouts of the F1 23 / F1 24 packets the listener consumes.
//!
//! All values are little-endian. Every packet starts with the 29-byte header,
//! followed (for per-car packets) by `MAX_CARS` fixed-size entries.

use byteorder::{LittleEndian, ReadBytesExt};
use edge_ingest_core::{
    CarDamage, CarLap, CarMotion, CarStatus, CarTelemetry, IngestError, SessionInfo, MAX_CARS,
};
use std::io::{self, Cursor};

pub const HEADER_SIZE: usize = 29;

pub const FORMAT_2023: u16 = 2023;
pub const FORMAT_2024: u16 = 2024;

pub const PACKET_MOTION: u8 = 0;
pub const PACKET_SESSION: u8 = 1;
pub const PACKET_LAP_DATA: u8 = 2;
pub const PACKET_CAR_TELEMETRY: u8 = 6;
pub const PACKET_CAR_STATUS: u8 = 7;
pub const PACKET_CAR_DAMAGE: u8 = 10;

pub const MOTION_ENTRY_SIZE: usize = 60;
pub const CAR_TELEMETRY_ENTRY_SIZE: usize = 60;
pub const CAR_STATUS_ENTRY_SIZE: usize = 55;
pub const CAR_DAMAGE_ENTRY_SIZE: usize = 42;
/// Session fields read: weather .. trackId.
pub const SESSION_PREFIX_SIZE: usize = 8;

/// Per-format differences. Only LapData changed between 2023 and 2024:
/// the car-in-front / leader deltas gained a minutes byte each, and a
/// speed-trap block was appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub lap_entry_size: usize,
    pub(crate) delta_block: usize,
}

impl Layout {
    pub fn for_format(format: u16) -> Result<Self, IngestError> {
        match format {
            FORMAT_2023 => Ok(Self { lap_entry_size: 50, delta_block: 4 }),
            FORMAT_2024 => Ok(Self { lap_entry_size: 57, delta_block: 6 }),
            other => Err(IngestError::UnsupportedFormat(other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PacketHeader {
    pub packet_format: u16,
    pub packet_id: u8,
    pub session_uid: u64,
    pub session_time: f32,
    pub frame_identifier: u32,
    pub player_car_index: u8,
}

pub fn read_header(buf: &[u8]) -> Result<PacketHeader, IngestError> {
    ensure_len(buf, HEADER_SIZE)?;
    let mut c = Cursor::new(buf);
    let packet_format = c.read_u16::<LittleEndian>()?;
    skip(&mut c, 4); // gameYear, major, minor, packetVersion
    let packet_id = c.read_u8()?;
    let session_uid = c.read_u64::<LittleEndian>()?;
    let session_time = read_f32(&mut c)?;
    let frame_identifier = c.read_u32::<LittleEndian>()?;
    skip(&mut c, 4); // overallFrameIdentifier
    let player_car_index = c.read_u8()?;
    // secondaryPlayerCarIndex ignored
    Ok(PacketHeader {
        packet_format,
        packet_id,
        session_uid,
        session_time,
        frame_identifier,
        player_car_index,
    })
}

/// Reads `MAX_CARS` consecutive entries of `entry` bytes each after the header.
fn read_cars<T>(
    buf: &[u8],
    entry: usize,
    mut read: impl FnMut(&mut Cursor<&[u8]>) -> io::Result<T>,
) -> Result<Vec<T>, IngestError> {
    ensure_len(buf, HEADER_SIZE + MAX_CARS * entry)?;
    let mut c = Cursor::new(buf);
    let mut cars = Vec::with_capacity(MAX_CARS);
    for i in 0..MAX_CARS {
        c.set_position((HEADER_SIZE + i * entry) as u64);
        cars.push(read(&mut c)?);
    }
    Ok(cars)
}

pub fn parse_motion(buf: &[u8]) -> Result<Vec<CarMotion>, IngestError> {
    read_cars(buf, MOTION_ENTRY_SIZE, |c| {
        let world_position = [read_f32(c)?, read_f32(c)?, read_f32(c)?];
        skip(c, 12); // world velocity
        skip(c, 12); // forward/right direction, normalised i16
        let g_force_lateral = read_f32(c)?;
        let g_force_longitudinal = read_f32(c)?;
        let g_force_vertical = read_f32(c)?;
        let yaw = read_f32(c)?;
        let pitch = read_f32(c)?;
        let roll = read_f32(c)?;
        Ok(CarMotion {
            world_position,
            g_force_lateral,
            g_force_longitudinal,
            g_force_vertical,
            yaw,
            pitch,
            roll,
        })
    })
}

pub fn parse_session(buf: &[u8]) -> Result<SessionInfo, IngestError> {
    ensure_len(buf, HEADER_SIZE + SESSION_PREFIX_SIZE)?;
    let mut c = Cursor::new(buf);
    c.set_position(HEADER_SIZE as u64);
    Ok(SessionInfo {
        weather: c.read_u8()?,
        track_temperature: c.read_i8()?,
        air_temperature: c.read_i8()?,
        total_laps: c.read_u8()?,
        track_length: c.read_u16::<LittleEndian>()?,
        session_type: c.read_u8()?,
        track_id: c.read_i8()?,
    })
}

pub fn parse_lap_data(buf: &[u8], layout: Layout) -> Result<Vec<CarLap>, IngestError> {
    read_cars(buf, layout.lap_entry_size, |c| {
        let last_lap_time_ms = c.read_u32::<LittleEndian>()?;
        let current_lap_time_ms = c.read_u32::<LittleEndian>()?;
        let sector1_time_ms = read_split_time(c)?;
        let sector2_time_ms = read_split_time(c)?;
        skip(c, layout.delta_block);
        let lap_distance = read_f32(c)?;
        let total_distance = read_f32(c)?;
        skip(c, 4); // safetyCarDelta
        let car_position = c.read_u8()?;
        let current_lap_num = c.read_u8()?;
        skip(c, 2); // pitStatus, numPitStops
        let sector = c.read_u8()?;
        Ok(CarLap {
            last_lap_time_ms,
            current_lap_time_ms,
            sector1_time_ms,
            sector2_time_ms,
            lap_distance,
            total_distance,
            car_position,
            current_lap_num,
            sector,
        })
    })
}

pub fn parse_car_telemetry(buf: &[u8]) -> Result<Vec<CarTelemetry>, IngestError> {
    read_cars(buf, CAR_TELEMETRY_ENTRY_SIZE, |c| {
        let speed_kmh = c.read_u16::<LittleEndian>()?;
        let throttle = read_f32(c)?;
        let steer = read_f32(c)?;
        let brake = read_f32(c)?;
        skip(c, 1); // clutch
        let gear = c.read_i8()?;
        let engine_rpm = c.read_u16::<LittleEndian>()?;
        let drs = c.read_u8()? != 0;
        Ok(CarTelemetry { speed_kmh, throttle, steer, brake, gear, engine_rpm, drs })
    })
}

pub fn parse_car_status(buf: &[u8]) -> Result<Vec<CarStatus>, IngestError> {
    read_cars(buf, CAR_STATUS_ENTRY_SIZE, |c| {
        skip(c, 5); // tractionControl, ABS, fuelMix, frontBrakeBias, pitLimiter
        let fuel_in_tank = read_f32(c)?;
        skip(c, 4); // fuelCapacity
        let fuel_remaining_laps = read_f32(c)?;
        // maxRPM .. enginePowerMGUK
        skip(c, 20);
        let ers_store_energy = read_f32(c)?;
        let ers_deploy_mode = c.read_u8()?;
        Ok(CarStatus { fuel_in_tank, fuel_remaining_laps, ers_store_energy, ers_deploy_mode })
    })
}

pub fn parse_car_damage(buf: &[u8]) -> Result<Vec<CarDamage>, IngestError> {
    read_cars(buf, CAR_DAMAGE_ENTRY_SIZE, |c| {
        let tyres_wear = [read_f32(c)?, read_f32(c)?, read_f32(c)?, read_f32(c)?];
        Ok(CarDamage { tyres_wear })
    })
}

/// Sector times are sent as a u16 millisecond part plus a u8 minutes part.
fn read_split_time(c: &mut Cursor<&[u8]>) -> io::Result<u32> {
    let ms = u32::from(c.read_u16::<LittleEndian>()?);
    let minutes = u32::from(c.read_u8()?);
    Ok(minutes * 60_000 + ms)
}

/// Non-finite floats are replaced by 0 so nothing downstream sees NaN.
fn read_f32(c: &mut Cursor<&[u8]>) -> io::Result<f32> {
    let v = c.read_f32::<LittleEndian>()?;
    Ok(if v.is_finite() { v } else { 0.0 })
}

fn skip(c: &mut Cursor<&[u8]>, n: usize) {
    let pos = c.position();
    c.set_position(pos + n as u64);
}

fn ensure_len(buf: &[u8], need: usize) -> Result<(), IngestError> {
    if buf.len() < need {
        return Err(IngestError::Truncated { len: buf.len(), need });
    }
    Ok(())
}
