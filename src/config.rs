use crate::error::{NodeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
///
/// Call before any other thread exists (in particular before the tokio
/// runtime is built).
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

pub fn load_dotenv_from(env_path: &Path) {
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: callers run this before spawning threads, see `load_dotenv`
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            if !key.is_empty() {
                pairs.push((key, value));
            }
        }
    }
    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub master: MasterConfig,
    pub heartbeat: HeartbeatConfig,
    pub network: NetworkConfig,
    pub sensors: Vec<SensorConfig>,
    pub gpio: GpioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identity reported to the master in every message.
    pub id: u32,
    pub loop_sleep_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub interface: String,
    /// Empty for a wired link.
    pub ssid: String,
    pub password: Option<String>,
    pub connect_timeout_ms: u64,
    pub ntp_server: Option<String>,
    pub ntp_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub channel_id: u32,
    pub pin: u32,
    pub debounce_ms: u64,
}

impl SensorConfig {
    pub fn new(channel_id: u32, pin: u32, debounce_ms: u64) -> Self {
        Self {
            channel_id,
            pin,
            debounce_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioBackend {
    Sysfs,
    Simulated,
}

impl FromStr for GpioBackend {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sysfs" => Ok(Self::Sysfs),
            "simulated" | "sim" => Ok(Self::Simulated),
            other => Err(NodeError::Config(format!("unknown GPIO backend '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioConfig {
    pub backend: GpioBackend,
    pub sysfs_root: String,
    /// Mean spacing of simulated triggers, 0 disables the simulation task.
    pub simulate_interval_ms: u64,
}

pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig {
                id: 1,
                loop_sleep_ms: 10,
            },
            master: MasterConfig {
                base_url: "http://192.168.1.1".to_string(),
                request_timeout_ms: 2000,
            },
            heartbeat: HeartbeatConfig { interval_ms: 5000 },
            network: NetworkConfig {
                interface: "wlan0".to_string(),
                ssid: String::new(),
                password: None,
                connect_timeout_ms: 10_000,
                ntp_server: None,
                ntp_timeout_ms: 1000,
            },
            sensors: vec![
                SensorConfig::new(1, 13, DEFAULT_DEBOUNCE_MS),
                SensorConfig::new(2, 12, DEFAULT_DEBOUNCE_MS),
            ],
            gpio: GpioConfig {
                backend: GpioBackend::Sysfs,
                sysfs_root: "/sys/class/gpio".to_string(),
                simulate_interval_ms: 0,
            },
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| NodeError::Config(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

/// Parse `channel:pin[:debounce_ms]` entries separated by commas.
pub fn parse_sensor_list(raw: &str) -> Result<Vec<SensorConfig>> {
    let invalid = |entry: &str| NodeError::Config(format!("invalid sensor entry '{}'", entry));

    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let fields: Vec<&str> = entry.split(':').map(str::trim).collect();
            let (channel, pin, debounce) = match fields.as_slice() {
                [channel, pin] => (*channel, *pin, None),
                [channel, pin, debounce] => (*channel, *pin, Some(*debounce)),
                _ => return Err(invalid(entry)),
            };
            let channel_id = channel.parse().map_err(|_| invalid(entry))?;
            let pin = pin.parse().map_err(|_| invalid(entry))?;
            let debounce_ms = match debounce {
                Some(d) => d.parse().map_err(|_| invalid(entry))?,
                None => DEFAULT_DEBOUNCE_MS,
            };
            Ok(SensorConfig::new(channel_id, pin, debounce_ms))
        })
        .collect()
}

/// Prefix a bare host with `http://` and drop trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(id) = env_parse("RACE_NODE_ID")? {
            config.node.id = id;
        }
        if let Some(sleep) = env_parse("RACE_LOOP_SLEEP_MS")? {
            config.node.loop_sleep_ms = sleep;
        }

        // Master
        if let Ok(url) = std::env::var("MASTER_URL") {
            config.master.base_url = normalize_base_url(&url);
        }
        if let Some(timeout) = env_parse("MASTER_TIMEOUT_MS")? {
            config.master.request_timeout_ms = timeout;
        }
        if let Some(interval) = env_parse("HEARTBEAT_INTERVAL_MS")? {
            config.heartbeat.interval_ms = interval;
        }

        // Network link
        if let Ok(interface) = std::env::var("NET_INTERFACE") {
            config.network.interface = interface;
        }
        if let Ok(ssid) = std::env::var("WIFI_SSID") {
            config.network.ssid = ssid;
        }
        if let Ok(password) = std::env::var("WIFI_PASSWORD") {
            config.network.password = Some(password);
        }
        if let Some(timeout) = env_parse("CONNECT_TIMEOUT_MS")? {
            config.network.connect_timeout_ms = timeout;
        }
        if let Ok(server) = std::env::var("NTP_SERVER")
            && !server.trim().is_empty()
        {
            config.network.ntp_server = Some(server.trim().to_string());
        }
        if let Some(timeout) = env_parse("NTP_TIMEOUT_MS")? {
            config.network.ntp_timeout_ms = timeout;
        }

        // Sensors and GPIO
        if let Ok(sensors) = std::env::var("SENSORS") {
            config.sensors = parse_sensor_list(&sensors)?;
        }
        if let Some(backend) = env_parse("GPIO_BACKEND")? {
            config.gpio.backend = backend;
        }
        if let Ok(root) = std::env::var("GPIO_SYSFS_ROOT") {
            config.gpio.sysfs_root = root;
        }
        if let Some(interval) = env_parse("SIMULATE_INTERVAL_MS")? {
            config.gpio.simulate_interval_ms = interval;
        }

        Ok(config)
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sensors.is_empty() {
            return Err(NodeError::Config("no sensors configured".into()));
        }

        let mut channels = HashSet::new();
        let mut pins = HashSet::new();
        for sensor in &self.sensors {
            if !channels.insert(sensor.channel_id) {
                return Err(NodeError::Config(format!(
                    "duplicate sensor channel {}",
                    sensor.channel_id
                )));
            }
            if !pins.insert(sensor.pin) {
                return Err(NodeError::Config(format!(
                    "pin {} assigned to more than one sensor",
                    sensor.pin
                )));
            }
        }

        if self.heartbeat.interval_ms == 0 {
            return Err(NodeError::Config("heartbeat interval must be positive".into()));
        }
        if self.master.base_url.trim().is_empty() {
            return Err(NodeError::Config("master URL is empty".into()));
        }
        Ok(())
    }
}
