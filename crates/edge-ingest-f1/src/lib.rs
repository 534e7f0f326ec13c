use anyhow::Context;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};
use edge_ingest_core::*;

pub mod builders;
pub mod packets;

use packets::*;

const MAX_PACKET_BYTES: usize = 2048;

#[derive(Clone, Debug)]
pub struct F1Config {
    pub bind_addr: String,       // e.g. "0.0.0.0:20777"
}

impl F1Config {
    pub fn on_port(port: u16) -> Self {
        Self { bind_addr: format!("0.0.0.0:{port}") }
    }
}

impl Default for F1Config {
    fn default() -> Self {
        Self::on_port(20777)
    }
}

pub struct F1Source {
    cfg: F1Config
}

impl F1Source {
    pub fn new(cfg: F1Config) -> Self { Self { cfg } }

    /// Receive loop on an already bound socket. Returns once the tick receiver is gone.
    pub async fn run_on(socket: UdpSocket, tx: TickTx) -> Result<(), IngestError> {
        let mut buf = vec![0u8; MAX_PACKET_BYTES];
        loop {
            let len = match socket.recv_from(&mut buf).await {
                Ok((len, _peer)) => len,
                Err(err) => {
                    warn!(error = %err, "F1 UDP receive error");
                    continue;
                }
            };
            match decode(&buf[..len]) {
                Ok(Some(tick)) => {
                    if tx.send(tick).is_err() {
                        debug!("tick receiver dropped, stopping F1 source");
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(err) => debug!(error = %err, len, "dropping undecodable F1 packet"),
            }
        }
    }
}

#[async_trait::async_trait]
impl TickSource for F1Source {
    async fn run(&self, tx: TickTx) -> Result<(), IngestError> {
        let socket = UdpSocket::bind(&self.cfg.bind_addr).await
            .with_context(|| format!("bind {}", self.cfg.bind_addr))?;
        info!(addr = %self.cfg.bind_addr, "F1 UDP source bound (formats 2023/2024)");
        Self::run_on(socket, tx).await
    }
}

/// Decode one datagram. `Ok(None)` for packet kinds the listener does not consume.
pub fn decode(buf: &[u8]) -> Result<Option<Tick>, IngestError> {
    let hdr = read_header(buf)?;
    let layout = Layout::for_format(hdr.packet_format)?;
    if usize::from(hdr.player_car_index) >= MAX_CARS {
        // 255 while spectating
        return Err(IngestError::PlayerIndex(hdr.player_car_index));
    }

    let payload = match hdr.packet_id {
        PACKET_MOTION => TickPayload::Motion(parse_motion(buf)?),
        PACKET_SESSION => TickPayload::Session(parse_session(buf)?),
        PACKET_LAP_DATA => TickPayload::LapData(parse_lap_data(buf, layout)?),
        PACKET_CAR_TELEMETRY => TickPayload::CarTelemetry(parse_car_telemetry(buf)?),
        PACKET_CAR_STATUS => TickPayload::CarStatus(parse_car_status(buf)?),
        PACKET_CAR_DAMAGE => TickPayload::CarDamage(parse_car_damage(buf)?),
        _ => return Ok(None),
    };

    Ok(Some(Tick {
        session_uid: hdr.session_uid,
        player_index: hdr.player_car_index,
        frame: hdr.frame_identifier,
        session_time_s: hdr.session_time,
        payload,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn lap(position: u8, total: f32) -> CarLap {
        CarLap { car_position: position, total_distance: total, current_lap_num: 1, ..Default::default() }
    }

    #[test]
    fn header_fields_are_read() -> TestResult {
        let raw = builders::header(FORMAT_2023, PACKET_CAR_DAMAGE, 0xDEAD_BEEF, 5);
        let hdr = read_header(&raw)?;
        assert_eq!(hdr.packet_format, 2023);
        assert_eq!(hdr.packet_id, 10);
        assert_eq!(hdr.session_uid, 0xDEAD_BEEF);
        assert_eq!(hdr.player_car_index, 5);
        Ok(())
    }

    #[test]
    fn short_header_is_truncated() {
        let err = decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, IngestError::Truncated { len: 10, need: HEADER_SIZE }));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let raw = builders::car_damage(2022, 1, 0, &[]);
        assert!(matches!(decode(&raw), Err(IngestError::UnsupportedFormat(2022))));
    }

    #[test]
    fn spectator_player_index_is_rejected() {
        let raw = builders::car_damage(FORMAT_2023, 1, 255, &[]);
        assert!(matches!(decode(&raw), Err(IngestError::PlayerIndex(255))));
    }

    #[test]
    fn unconsumed_packet_ids_are_skipped() -> TestResult {
        let raw = builders::header(FORMAT_2023, 3, 1, 0); // event packet
        assert!(decode(&raw)?.is_none());
        Ok(())
    }

    #[test]
    fn lap_data_2023_and_2024_decode_identically() -> TestResult {
        let mut me = lap(2, 1234.5);
        me.sector1_time_ms = 78_250; // 1:18.250, needs the minutes byte
        me.sector2_time_ms = 19_200;
        me.last_lap_time_ms = 95_000;
        me.current_lap_num = 3;
        let cars = vec![lap(1, 1300.0), me.clone(), lap(3, 1100.0)];

        for format in [FORMAT_2023, FORMAT_2024] {
            let tick = decode(&builders::lap_data(format, 42, 1, &cars))?.ok_or("no tick")?;
            assert_eq!(tick.kind(), TickKind::LapData);
            assert_eq!(tick.session_uid, 42);
            let TickPayload::LapData(laps) = tick.payload else { panic!("wrong payload") };
            assert_eq!(laps.len(), MAX_CARS);
            assert_eq!(laps[1], me);
            assert_eq!(laps[0].car_position, 1);
            assert_eq!(laps[5].car_position, 0);
        }
        Ok(())
    }

    #[test]
    fn lap_data_2024_rejects_2023_sized_buffer() {
        let mut raw = builders::lap_data(FORMAT_2023, 1, 0, &[]);
        raw[0..2].copy_from_slice(&FORMAT_2024.to_le_bytes());
        assert!(matches!(decode(&raw), Err(IngestError::Truncated { .. })));
    }

    #[test]
    fn car_telemetry_fields() -> TestResult {
        let t = CarTelemetry { speed_kmh: 287, throttle: 1.0, steer: 0.0, brake: 0.0, gear: 8, engine_rpm: 11800, drs: true };
        let tick = decode(&builders::car_telemetry(FORMAT_2024, 1, 0, &[t.clone()]))?.ok_or("no tick")?;
        let TickPayload::CarTelemetry(cars) = tick.payload else { panic!("wrong payload") };
        assert_eq!(cars[0], t);
        Ok(())
    }

    #[test]
    fn car_status_reads_ers_block() -> TestResult {
        let s = CarStatus { fuel_in_tank: 42.5, fuel_remaining_laps: 12.0, ers_store_energy: 2_000_000.0, ers_deploy_mode: 3 };
        let tick = decode(&builders::car_status(FORMAT_2023, 1, 0, &[CarStatus::default(), s.clone()]))?.ok_or("no tick")?;
        let TickPayload::CarStatus(cars) = tick.payload else { panic!("wrong payload") };
        assert_eq!(cars[1], s);
        Ok(())
    }

    #[test]
    fn car_damage_nan_wear_reads_as_zero() -> TestResult {
        let d = CarDamage { tyres_wear: [1.5, f32::NAN, 2.0, 3.25] };
        let tick = decode(&builders::car_damage(FORMAT_2023, 1, 0, &[d]))?.ok_or("no tick")?;
        let TickPayload::CarDamage(cars) = tick.payload else { panic!("wrong payload") };
        assert_eq!(cars[0].tyres_wear, [1.5, 0.0, 2.0, 3.25]);
        Ok(())
    }

    #[test]
    fn motion_and_session() -> TestResult {
        let m = CarMotion { world_position: [10.0, 1.0, -5.0], g_force_lateral: 3.5, g_force_longitudinal: -1.0, g_force_vertical: 1.0, yaw: 0.1, pitch: 0.0, roll: 0.0 };
        let tick = decode(&builders::motion(FORMAT_2023, 1, 0, &[m.clone()]))?.ok_or("no tick")?;
        let TickPayload::Motion(cars) = tick.payload else { panic!("wrong payload") };
        assert_eq!(cars[0], m);

        let info = SessionInfo { weather: 3, track_temperature: 31, air_temperature: 24, total_laps: 5, track_length: 5793, session_type: 18, track_id: 10 };
        let tick = decode(&builders::session(FORMAT_2023, 1, &info))?.ok_or("no tick")?;
        let TickPayload::Session(got) = tick.payload else { panic!("wrong payload") };
        assert_eq!(got, info);
        Ok(())
    }

    #[tokio::test]
    async fn source_forwards_decoded_ticks() -> TestResult {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let (tx, rx) = channel();
        tokio::spawn(F1Source::run_on(socket, tx));

        let sender = UdpSocket::bind("127.0.0.1:0").await?;
        sender.send_to(b"garbage", addr).await?;
        sender.send_to(&builders::car_damage(FORMAT_2023, 9, 0, &[]), addr).await?;

        let tick = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(2))).await??;
        assert_eq!(tick.kind(), TickKind::CarDamage);
        assert_eq!(tick.session_uid, 9);
        Ok(())
    }
}
