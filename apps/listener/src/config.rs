use tracing::warn;

pub const DEFAULT_UDP_PORT: u16 = 20777;
pub const DEFAULT_DRIVER_NAME: &str = "Unknown";
pub const DEFAULT_MQTT_BROKER: &str = "127.0.0.1";
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Startup settings, read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub udp_port: u16,
    pub driver_name: String,
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    /// Text-to-speech program plus fixed arguments, split on whitespace with no
    /// quoting; the cue is appended last.
    pub announcer_cmd: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_UDP_PORT,
            driver_name: DEFAULT_DRIVER_NAME.into(),
            mqtt_broker: DEFAULT_MQTT_BROKER.into(),
            mqtt_port: DEFAULT_MQTT_PORT,
            announcer_cmd: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            udp_port: port(&get, "UDP_PORT", DEFAULT_UDP_PORT),
            driver_name: text(&get, "DRIVER_NAME").unwrap_or_else(|| DEFAULT_DRIVER_NAME.into()),
            mqtt_broker: text(&get, "MQTT_BROKER").unwrap_or_else(|| DEFAULT_MQTT_BROKER.into()),
            mqtt_port: port(&get, "MQTT_PORT", DEFAULT_MQTT_PORT),
            announcer_cmd: text(&get, "ANNOUNCER_CMD"),
        }
    }

    /// One client per listener port, so several rigs can share a broker.
    pub fn client_id(&self) -> String {
        format!("Edge_{}", self.udp_port)
    }
}

fn text(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn port(get: &impl Fn(&str) -> Option<String>, key: &str, default: u16) -> u16 {
    let Some(raw) = get(key) else { return default };
    match raw.trim().parse::<u16>() {
        Ok(p) if p != 0 => p,
        _ => {
            warn!(key, value = %raw, default, "invalid port, using default");
            default
        }
    }
}
