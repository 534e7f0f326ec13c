//! edge-listener - turns F1 23/24 UDP telemetry into filtered MQTT events and
//! spoken race-engineer cues.

mod announcer;
mod config;
mod session;
mod sink;

use anyhow::{Context, Result};
use edge_ingest_f1::{F1Config, F1Source};
use engine::SessionContext;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use announcer::{Announcer, CommandSpeaker, LogSpeaker};
use config::Config;
use sink::MqttSink;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cfg = Config::from_env();
    info!(
        driver = %cfg.driver_name,
        udp_port = cfg.udp_port,
        broker = %cfg.mqtt_broker,
        mqtt_port = cfg.mqtt_port,
        client_id = %cfg.client_id(),
        "listener starting"
    );

    let sink = MqttSink::start(&cfg);
    let (announcer, _speaker) = match cfg.announcer_cmd.as_deref().and_then(CommandSpeaker::parse) {
        Some(cmd) => Announcer::spawn(cmd),
        None => Announcer::spawn(LogSpeaker),
    }
    .context("starting announcer")?;

    let ctx = SessionContext::new(cfg.driver_name.clone(), cfg.udp_port);
    info!(session = %ctx.session_label, "recording");

    let source = F1Source::new(F1Config::on_port(cfg.udp_port));
    let ctx = session::run_source(source, ctx, sink, announcer).await?;
    info!(sessions = ctx.session_ordinal, "listener stopped");
    Ok(())
}
