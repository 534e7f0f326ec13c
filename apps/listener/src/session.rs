//! Wiring between the UDP source, the engine and the two outputs.

use std::{
    io,
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use edge_ingest_core::{channel, Tick, TickRx, TickSource};
use engine::{process_tick, Emission, SessionContext};
use tracing::{debug, info, warn};

use crate::{announcer::Announcer, sink::EventSink};

/// Run `src` until it stops, feeding a single pump thread that owns the
/// session context. Returns the context as it was when the stream ended.
pub async fn run_source<S, K>(src: S, ctx: SessionContext, sink: K, announcer: Announcer) -> Result<SessionContext>
where
    S: TickSource + 'static,
    K: EventSink,
{
    let (tx, rx) = channel();
    let pump = spawn_pump(rx, ctx, sink, announcer).context("starting pump thread")?;

    // tx is dropped when run() returns, which ends the pump
    let source_result = src.run(tx).await;

    let ctx = tokio::task::spawn_blocking(move || pump.join())
        .await?
        .map_err(|_| anyhow!("pump thread panicked"))?;
    source_result.context("telemetry source")?;
    Ok(ctx)
}

pub fn spawn_pump<K: EventSink>(
    rx: TickRx,
    mut ctx: SessionContext,
    sink: K,
    announcer: Announcer,
) -> io::Result<JoinHandle<SessionContext>> {
    thread::Builder::new().name("tick-pump".into()).spawn(move || {
        for tick in rx.iter() {
            handle_tick(&mut ctx, &tick, &sink, &announcer);
        }
        info!(session = %ctx.session_label, "tick stream closed");
        ctx
    })
}

pub fn handle_tick<K: EventSink>(ctx: &mut SessionContext, tick: &Tick, sink: &K, announcer: &Announcer) {
    let emissions = match process_tick(ctx, tick) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, kind = ?tick.kind(), frame = tick.frame, "tick rejected");
            return;
        }
    };
    for emission in emissions {
        match emission {
            Emission::Publish(env) => {
                if let Err(e) = sink.publish(&env) {
                    debug!(error = %e, "publish dropped");
                }
            }
            Emission::Announce(text) => {
                announcer.announce(text);
            }
        }
    }
}
