//! Property checks over random tick streams.

use edge_ingest_core::{CarDamage, CarLap, CarTelemetry, Tick, TickPayload, MAX_CARS};
use engine::{laps::sector3, process_tick, Emission, SessionContext};
use model::Event;
use proptest::prelude::*;

fn tick(uid: u64, player: u8, payload: TickPayload) -> Tick {
    Tick { session_uid: uid, player_index: player, frame: 0, session_time_s: 0.0, payload }
}

fn published(out: &[Emission]) -> Vec<&Event> {
    out.iter()
        .filter_map(|e| match e {
            Emission::Publish(env) => Some(&env.event),
            Emission::Announce(_) => None,
        })
        .collect()
}

fn speed_tick(player: u8, speed_kmh: u16) -> Tick {
    let mut cars = vec![CarTelemetry::default(); MAX_CARS];
    cars[usize::from(player)].speed_kmh = speed_kmh;
    tick(1, player, TickPayload::CarTelemetry(cars))
}

/// A full field with shuffled positions and random distances.
fn field() -> impl Strategy<Value = (Vec<CarLap>, u8)> {
    (
        Just((1..=MAX_CARS as u8).collect::<Vec<u8>>()).prop_shuffle(),
        prop::collection::vec(0.0f32..20_000.0, MAX_CARS),
        0..MAX_CARS as u8,
    )
        .prop_map(|(positions, distances, player)| {
            let laps = positions
                .into_iter()
                .zip(distances)
                .map(|(car_position, total_distance)| CarLap { car_position, total_distance, ..Default::default() })
                .collect();
            (laps, player)
        })
}

proptest! {
    #[test]
    fn ordinal_moves_by_one_per_boundary(
        stream in prop::collection::vec((0u64..3, 0.0f32..2_000.0), 1..200),
    ) {
        let mut ctx = SessionContext::new("P", 1);
        let mut prev_ordinal = ctx.session_ordinal;
        let mut prev_max = ctx.max_distance_reached;

        for (uid, d) in stream {
            let mut cars = vec![CarLap::default(); MAX_CARS];
            cars[0].total_distance = d;
            let out = process_tick(&mut ctx, &tick(uid, 0, TickPayload::LapData(cars))).unwrap();
            let started = published(&out).iter().filter(|e| matches!(e, Event::SessionStarted(_))).count() as u32;

            prop_assert!(started <= 1);
            prop_assert_eq!(ctx.session_ordinal, prev_ordinal + started);
            if started == 0 {
                prop_assert!(ctx.max_distance_reached >= prev_max);
            }
            prev_ordinal = ctx.session_ordinal;
            prev_max = ctx.max_distance_reached;
        }
    }

    #[test]
    fn lap_events_add_up(
        laps in prop::collection::vec((0u32..60_000, 0u32..60_000, 0u32..200_000, 0u8..5), 1..60),
    ) {
        let mut ctx = SessionContext::new("P", 1);
        for (i, (s1, s2, last, num)) in laps.into_iter().enumerate() {
            let mut cars = vec![CarLap::default(); MAX_CARS];
            cars[0] = CarLap {
                sector1_time_ms: s1,
                sector2_time_ms: s2,
                last_lap_time_ms: last,
                current_lap_num: num,
                total_distance: i as f32 * 10.0,
                ..Default::default()
            };
            let out = process_tick(&mut ctx, &tick(1, 0, TickPayload::LapData(cars))).unwrap();
            for e in published(&out) {
                if let Event::LapCompleted(l) = e {
                    prop_assert!(l.lap >= 1);
                    prop_assert!(l.sector3_s >= 0.0);
                    prop_assert_eq!(l.sector3_s, sector3(l.lap_time_s, l.sector1_s, l.sector2_s));
                    if l.lap_time_s >= l.sector1_s + l.sector2_s {
                        prop_assert!((l.sector1_s + l.sector2_s + l.sector3_s - l.lap_time_s).abs() < 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    fn slow_player_never_has_a_rival((laps, player) in field(), speed in 0u16..=36) {
        let mut ctx = SessionContext::new("P", 1);
        process_tick(&mut ctx, &speed_tick(player, speed)).unwrap();
        let out = process_tick(&mut ctx, &tick(1, player, TickPayload::LapData(laps))).unwrap();
        prop_assert_eq!(ctx.target_rival_index, None);
        prop_assert!(!published(&out).iter().any(|e| matches!(e, Event::Rival(_))));
    }

    #[test]
    fn rival_is_always_an_adjacent_position((laps, player) in field(), speed in 37u16..350) {
        let mut ctx = SessionContext::new("P", 1);
        process_tick(&mut ctx, &speed_tick(player, speed)).unwrap();
        process_tick(&mut ctx, &tick(1, player, TickPayload::LapData(laps.clone()))).unwrap();

        if let Some(idx) = ctx.target_rival_index {
            prop_assert_ne!(idx, usize::from(player));
            let mine = i32::from(laps[usize::from(player)].car_position);
            let theirs = i32::from(laps[idx].car_position);
            prop_assert_eq!((mine - theirs).abs(), 1);
            prop_assert!(ctx.target_rival_gap_s.unwrap_or(f64::MAX) < 5.0);
        }
    }

    #[test]
    fn tyre_wear_published_iff_changed(
        wears in prop::collection::vec(
            (0u64..3, prop::array::uniform4(prop::sample::select(vec![0.0f32, 1.5, 3.0]))),
            1..50,
        ),
    ) {
        let mut ctx = SessionContext::new("P", 1);
        let mut last: Option<[f32; 4]> = None;
        // session changes in between must not matter
        for (uid, wear) in wears {
            let mut cars = vec![CarDamage::default(); MAX_CARS];
            cars[0].tyres_wear = wear;
            let out = process_tick(&mut ctx, &tick(uid, 0, TickPayload::CarDamage(cars))).unwrap();
            let emitted = published(&out).iter().any(|e| matches!(e, Event::TyreWear(_)));
            prop_assert_eq!(emitted, last != Some(wear));
            last = Some(wear);
        }
    }
}
