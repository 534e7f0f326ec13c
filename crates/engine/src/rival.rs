//! Picks the single car worth tracking: whichever of the cars directly ahead of
//! or behind the player is closer in time, as long as it is within the
//! proximity window.

use edge_ingest_core::CarLap;
use model::{Event, RivalDirection, RivalUpdate};
use tracing::debug;

use crate::{Emission, SessionContext};

/// Below this player speed (m/s) time gaps are meaningless; selection disengages.
pub const ENGAGE_SPEED_MS: f64 = 10.0;
/// Maximum time gap (s) for a car to be tracked.
pub const PROXIMITY_WINDOW_S: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub direction: RivalDirection,
    pub gap_s: f64,
}

/// Nearest of the cars at `position - 1` and `position + 1`. Ties go to the car ahead.
/// Reads positions from `ctx.grid`, which must already reflect `laps`.
pub fn nearest_neighbour(ctx: &SessionContext, laps: &[CarLap], player: usize) -> Option<Candidate> {
    let me = laps.get(player)?;
    let my_pos = usize::from(me.car_position);
    if my_pos == 0 || ctx.current_speed_ms <= 0.0 {
        return None;
    }

    let neighbours = [
        (my_pos.checked_sub(1), RivalDirection::Ahead),
        (Some(my_pos + 1), RivalDirection::Behind),
    ];

    let mut best: Option<Candidate> = None;
    for (pos, direction) in neighbours {
        let Some(index) = pos.and_then(|p| ctx.grid.at(p)) else { continue };
        if index == player {
            continue;
        }
        let Some(car) = laps.get(index) else { continue };
        let gap_s = (f64::from(car.total_distance) - f64::from(me.total_distance)).abs() / ctx.current_speed_ms;
        if best.map_or(true, |b| gap_s < b.gap_s) {
            best = Some(Candidate { index, direction, gap_s });
        }
    }
    best
}

/// Update the tracked rival for this lap-data tick, emitting a `rival` event
/// whenever the target or its side changes.
pub fn on_lap_data(ctx: &mut SessionContext, laps: &[CarLap], player: usize, out: &mut Vec<Emission>) {
    let previous = (ctx.target_rival_index, ctx.target_rival_direction);
    ctx.grid.rebuild(laps);

    let selected = if ctx.current_speed_ms > ENGAGE_SPEED_MS {
        nearest_neighbour(ctx, laps, player).filter(|c| c.gap_s < PROXIMITY_WINDOW_S)
    } else {
        None
    };

    match selected {
        Some(c) => {
            if ctx.target_rival_index != Some(c.index) {
                // new car: its deploy mode has not been seen yet
                ctx.last_rival_ers_mode = None;
            }
            ctx.target_rival_index = Some(c.index);
            ctx.target_rival_direction = c.direction;
            ctx.target_rival_gap_s = Some(c.gap_s);
        }
        None => ctx.clear_rival(),
    }

    if previous != (ctx.target_rival_index, ctx.target_rival_direction) {
        debug!(
            rival = ?ctx.target_rival_index,
            direction = ?ctx.target_rival_direction,
            gap_s = ?ctx.target_rival_gap_s,
            "rival changed"
        );
        out.push(Emission::Publish(ctx.envelope(Event::Rival(RivalUpdate {
            rival_index: ctx.target_rival_index.map(|i| i as u8),
            direction: ctx.target_rival_direction,
            gap_s: ctx.target_rival_gap_s,
        }))));
    }
}
