//! Distance tracking and lap/sector reconstruction for the player car.
//!
//! The game never says "lap complete" in a way that survives restarts and
//! flashbacks on its own. Completion is inferred from a change of the cumulative
//! last-lap time, and sector 3 is derived as lap minus sectors 1 and 2.

use edge_ingest_core::CarLap;
use model::{BoundaryKind, Event, LapCompleted, SectorTime};
use tracing::debug;

use crate::{boundary, Emission, SessionContext};

/// Distance (m) the car must have covered before a drop counts as a restart.
pub const SOFT_RESET_FROM_M: f64 = 300.0;
/// A restart puts the car back below this distance (m).
pub const SOFT_RESET_TO_M: f64 = 100.0;

pub fn on_lap_data(ctx: &mut SessionContext, me: &CarLap, out: &mut Vec<Emission>) {
    track_distance(ctx, f64::from(me.total_distance), out);
    capture_sectors(ctx, me, out);
    detect_lap(ctx, me, out);
}

/// Keeps the running maximum. A smaller distance (flashback, out-of-order
/// packet) is ignored unless it looks like a restart. After a hard boundary the
/// maximum is already 0, so a soft boundary cannot fire on the same tick.
fn track_distance(ctx: &mut SessionContext, d: f64, out: &mut Vec<Emission>) {
    if ctx.max_distance_reached > SOFT_RESET_FROM_M && d < SOFT_RESET_TO_M {
        boundary::begin_session(ctx, BoundaryKind::Soft, out);
    } else if d > ctx.max_distance_reached {
        ctx.max_distance_reached = d;
    }
}

fn capture_sectors(ctx: &mut SessionContext, me: &CarLap, out: &mut Vec<Emission>) {
    let lap = u32::from(me.current_lap_num);
    if me.sector1_time_ms > 0 && !ctx.sector1_sent {
        ctx.held_sector1 = ms_to_s(me.sector1_time_ms);
        ctx.sector1_sent = true;
        out.push(sector_event(ctx, 1, ctx.held_sector1, lap));
    }
    if me.sector2_time_ms > 0 && !ctx.sector2_sent {
        ctx.held_sector2 = ms_to_s(me.sector2_time_ms);
        ctx.sector2_sent = true;
        out.push(sector_event(ctx, 2, ctx.held_sector2, lap));
    }
}

fn detect_lap(ctx: &mut SessionContext, me: &CarLap, out: &mut Vec<Emission>) {
    let lap_ms = me.last_lap_time_ms;
    if lap_ms == 0 || lap_ms == ctx.last_lap_time_recorded_ms {
        return;
    }

    // Lap 0 shows up right after boot; only report real laps.
    let finished = i32::from(me.current_lap_num) - 1;
    if finished >= 1 {
        let lap_time_s = ms_to_s(lap_ms);
        let sector3_s = sector3(lap_time_s, ctx.held_sector1, ctx.held_sector2);
        debug!(lap = finished, lap_time_s, sector3_s, "lap completed");
        out.push(Emission::Publish(ctx.envelope(Event::LapCompleted(LapCompleted {
            lap: finished as u32,
            lap_time_s,
            sector1_s: ctx.held_sector1,
            sector2_s: ctx.held_sector2,
            sector3_s,
            total_distance: ctx.max_distance_reached,
        }))));
    }

    ctx.last_lap_time_recorded_ms = lap_ms;
    ctx.clear_held_sectors();
}

/// Never negative: reported sector times can briefly disagree with the lap total.
pub fn sector3(lap_time_s: f64, sector1_s: f64, sector2_s: f64) -> f64 {
    (lap_time_s - sector1_s - sector2_s).max(0.0)
}

fn sector_event(ctx: &SessionContext, sector: u8, time_s: f64, lap: u32) -> Emission {
    Emission::Publish(ctx.envelope(Event::Sector(SectorTime {
        sector,
        time_s,
        lap,
        total_distance: ctx.max_distance_reached,
    })))
}

fn ms_to_s(ms: u32) -> f64 {
    f64::from(ms) / 1000.0
}
