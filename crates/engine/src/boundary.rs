use model::{BoundaryKind, Event, SessionStarted};
use tracing::info;

use crate::{Emission, SessionContext};

/// Track the session uid of an incoming tick. The first uid seen only sets the
/// baseline; any later change is a hard boundary.
pub fn observe_session_uid(ctx: &mut SessionContext, uid: u64, out: &mut Vec<Emission>) -> bool {
    match ctx.last_seen_session_uid.replace(uid) {
        Some(prev) if prev != uid => {
            begin_session(ctx, BoundaryKind::Hard, out);
            true
        }
        _ => false,
    }
}

/// Reset the context for a new session and announce it downstream.
pub fn begin_session(ctx: &mut SessionContext, kind: BoundaryKind, out: &mut Vec<Emission>) {
    let dropped_distance = ctx.max_distance_reached;
    ctx.start_new_session();
    info!(
        label = %ctx.session_label,
        ordinal = ctx.session_ordinal,
        boundary = ?kind,
        dropped_distance,
        "new session"
    );
    out.push(Emission::Publish(ctx.envelope(Event::SessionStarted(SessionStarted {
        ordinal: ctx.session_ordinal,
        boundary: kind,
    }))));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_uid_is_baseline_only() {
        let mut ctx = SessionContext::new("Max", 1);
        let mut out = Vec::new();
        assert!(!observe_session_uid(&mut ctx, 77, &mut out));
        assert_eq!(ctx.session_ordinal, 1);
        assert_eq!(ctx.last_seen_session_uid, Some(77));
        assert!(out.is_empty());
    }

    #[test]
    fn uid_change_is_hard_boundary() {
        let mut ctx = SessionContext::new("Max", 1);
        let mut out = Vec::new();
        observe_session_uid(&mut ctx, 77, &mut out);
        assert!(!observe_session_uid(&mut ctx, 77, &mut out));
        assert!(observe_session_uid(&mut ctx, 78, &mut out));
        assert_eq!(ctx.session_ordinal, 2);
        assert_eq!(ctx.session_label, "Max_S2");
        assert_eq!(ctx.last_seen_session_uid, Some(78));

        let [Emission::Publish(env)] = out.as_slice() else { panic!("expected one event, got {out:?}") };
        assert_eq!(env.driver_name, "Max_S2");
        assert_eq!(
            env.event,
            Event::SessionStarted(SessionStarted { ordinal: 2, boundary: BoundaryKind::Hard })
        );
    }

    #[test]
    fn returning_to_an_old_uid_is_another_boundary() {
        let mut ctx = SessionContext::new("Max", 1);
        let mut out = Vec::new();
        for uid in [1, 2, 1] {
            observe_session_uid(&mut ctx, uid, &mut out);
        }
        assert_eq!(ctx.session_ordinal, 3);
    }
}
