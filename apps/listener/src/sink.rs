//! Outbound event transport.

use std::time::Duration;

use model::{Envelope, TOPIC};
use rumqttc::{AsyncClient, ClientError, Event as MqttEvent, EventLoop, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use crate::config::Config;

const KEEP_ALIVE: Duration = Duration::from_secs(60);
/// Pause between reconnect attempts.
const RETRY_PAUSE: Duration = Duration::from_secs(1);
/// Publishes buffered in the client while the connection is down.
const REQUEST_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("encoding event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("mqtt client: {0}")]
    Client(#[from] ClientError),
}

pub trait EventSink: Send + 'static {
    fn publish(&self, envelope: &Envelope) -> Result<(), SinkError>;
}

/// Best-effort MQTT publisher. Never blocks the caller: a full request queue
/// is an error the caller may ignore.
pub struct MqttSink {
    client: AsyncClient,
}

impl MqttSink {
    /// Create the client and drive its event loop on the current tokio runtime.
    pub fn start(cfg: &Config) -> Self {
        let mut opts = MqttOptions::new(cfg.client_id(), cfg.mqtt_broker.clone(), cfg.mqtt_port);
        opts.set_keep_alive(KEEP_ALIVE);
        let (client, eventloop) = AsyncClient::new(opts, REQUEST_CAPACITY);
        tokio::spawn(drive(eventloop, cfg.mqtt_broker.clone(), cfg.mqtt_port));
        Self { client }
    }
}

impl EventSink for MqttSink {
    fn publish(&self, envelope: &Envelope) -> Result<(), SinkError> {
        let payload = envelope.to_json()?;
        self.client.try_publish(TOPIC, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }
}

/// Poll forever. Every poll after an error is a reconnect attempt.
async fn drive(mut eventloop: EventLoop, broker: String, port: u16) {
    // one warning per outage, the retries after it go to debug
    let mut outage_reported = false;
    loop {
        match eventloop.poll().await {
            Ok(MqttEvent::Incoming(Packet::ConnAck(_))) => {
                info!(%broker, port, "mqtt connected");
                outage_reported = false;
            }
            Ok(_) => {}
            Err(e) => {
                if outage_reported {
                    debug!(error = %e, "mqtt still unreachable");
                } else {
                    warn!(%broker, port, error = %e, "mqtt connection failed, retrying every second");
                    outage_reported = true;
                }
                tokio::time::sleep(RETRY_PAUSE).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Event, SessionStarted, BoundaryKind};

    #[tokio::test]
    async fn publish_does_not_wait_for_broker() {
        let cfg = Config { mqtt_broker: "127.0.0.1".into(), mqtt_port: 1, ..Config::default() };
        let sink = MqttSink::start(&cfg);
        let env = Envelope {
            driver_name: "Max_S1".into(),
            source_port: 20777,
            event: Event::SessionStarted(SessionStarted { ordinal: 1, boundary: BoundaryKind::Hard }),
        };
        assert!(sink.publish(&env).is_ok());
    }
}
