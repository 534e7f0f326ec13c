//! Session state machine and derived-event engine.
//!
//! [`process_tick`] is the only entry point: feed it every decoded tick, in
//! arrival order, together with the one [`SessionContext`] of the process. It
//! returns what should go out for that tick, already filtered.

use edge_ingest_core::{Tick, TickPayload};
use model::Envelope;

pub mod boundary;
pub mod context;
pub mod laps;
pub mod publish;
pub mod rival;

pub use context::{GridIndex, SessionContext};

/// Output of one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// Structured event for the downstream topic.
    Publish(Envelope),
    /// Short spoken cue for the announcer.
    Announce(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("player slot {player} missing from a {cars}-car payload")]
    PlayerIndex { player: usize, cars: usize },
}

pub fn process_tick(ctx: &mut SessionContext, tick: &Tick) -> Result<Vec<Emission>, EngineError> {
    let player = tick.player_slot();
    // Reject before touching the context so a bad tick leaves no trace.
    check_player(&tick.payload, player)?;

    let mut out = Vec::new();
    boundary::observe_session_uid(ctx, tick.session_uid, &mut out);

    match &tick.payload {
        TickPayload::LapData(cars) => {
            if let Some(me) = cars.get(player) {
                laps::on_lap_data(ctx, me, &mut out);
            }
            rival::on_lap_data(ctx, cars, player, &mut out);
        }
        TickPayload::CarTelemetry(cars) => {
            if let Some(me) = cars.get(player) {
                publish::on_car_telemetry(ctx, me, &mut out);
            }
        }
        TickPayload::Motion(cars) => {
            if let Some(me) = cars.get(player) {
                publish::on_motion(ctx, me, &mut out);
            }
        }
        TickPayload::CarStatus(cars) => publish::on_car_status(ctx, cars, player, &mut out),
        TickPayload::CarDamage(cars) => {
            if let Some(me) = cars.get(player) {
                publish::on_car_damage(ctx, me, &mut out);
            }
        }
        TickPayload::Session(info) => publish::on_session(ctx, info, &mut out),
    }
    Ok(out)
}

fn check_player(payload: &TickPayload, player: usize) -> Result<(), EngineError> {
    let cars = match payload {
        TickPayload::Motion(c) => c.len(),
        TickPayload::LapData(c) => c.len(),
        TickPayload::CarTelemetry(c) => c.len(),
        TickPayload::CarStatus(c) => c.len(),
        TickPayload::CarDamage(c) => c.len(),
        TickPayload::Session(_) => return Ok(()),
    };
    if player >= cars {
        return Err(EngineError::PlayerIndex { player, cars });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_ingest_core::{CarDamage, SessionInfo};

    fn tick(uid: u64, player: u8, payload: TickPayload) -> Tick {
        Tick { session_uid: uid, player_index: player, frame: 0, session_time_s: 0.0, payload }
    }

    #[test]
    fn bad_player_slot_is_rejected_without_side_effects() {
        let mut ctx = SessionContext::new("Max", 1);
        process_tick(&mut ctx, &tick(1, 0, TickPayload::CarDamage(vec![CarDamage::default()]))).unwrap();

        let err = process_tick(&mut ctx, &tick(2, 5, TickPayload::CarDamage(vec![CarDamage::default()])));
        assert!(matches!(err, Err(EngineError::PlayerIndex { player: 5, cars: 1 })));
        assert_eq!(ctx.session_ordinal, 1);
        assert_eq!(ctx.last_seen_session_uid, Some(1));
    }

    #[test]
    fn session_packet_counts_for_boundaries() {
        let mut ctx = SessionContext::new("Max", 1);
        process_tick(&mut ctx, &tick(1, 0, TickPayload::Session(SessionInfo::default()))).unwrap();
        let out = process_tick(&mut ctx, &tick(2, 0, TickPayload::Session(SessionInfo::default()))).unwrap();
        assert_eq!(ctx.session_ordinal, 2);
        // session_started, then conditions re-published for the new session
        assert_eq!(out.len(), 2);
    }
}
