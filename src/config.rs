use crate::prelude::*;

use bytes::Bytes;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

pub const DEFAULT_DEVICE_PORT: u16 = 53970;
pub const DEFAULT_QUERY_COMMAND: &str = "wifilocalMonitor:get dev real infor";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub devices: Vec<Device>,
    pub mqtt: Mqtt,

    #[serde(default = "Config::default_query")]
    pub query: Query,

    /// Repeat polling in-process every N seconds. Absent means a single cycle.
    pub poll_interval_secs: Option<u64>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Device {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Device {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub host: String,
    #[serde(default = "Config::default_device_port")]
    pub port: u16,
}
impl Device {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn target(&self) -> DeviceTarget {
        DeviceTarget::new(&self.host, self.port)
    }
} // }}}

// Mqtt {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Mqtt {
    pub host: String,
    #[serde(default = "Config::default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default = "Config::default_mqtt_client_id")]
    pub client_id: String,

    /// Optional prefix prepended to every published topic
    pub namespace: Option<String>,

    #[serde(default)]
    pub retain: bool,
}
impl Mqtt {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|n| !n.is_empty())
    }

    pub fn retain(&self) -> bool {
        self.retain
    }
} // }}}

// Query {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Query {
    #[serde(default = "Config::default_query_command")]
    pub command: String,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "Config::default_query_timeout", rename = "timeout_ms")]
    pub timeout: Duration,

    #[serde(default = "Config::default_query_delimiter")]
    pub delimiter: Option<String>,
}
impl Query {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref()
    }

    pub fn options(&self) -> QueryOptions {
        QueryOptions {
            timeout: self.timeout,
            delimiter: self
                .delimiter
                .as_ref()
                .map(|d| Bytes::copy_from_slice(d.as_bytes())),
        }
    }
} // }}}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn enabled_devices(&self) -> Vec<Device> {
        self.devices.iter().filter(|d| d.enabled()).cloned().collect()
    }

    pub fn targets(&self) -> Vec<DeviceTarget> {
        self.enabled_devices().iter().map(Device::target).collect()
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!(
            "  Devices: {} configured, {} enabled",
            self.devices.len(),
            self.devices.iter().filter(|d| d.enabled).count()
        );
        for (i, dev) in self.devices.iter().enumerate() {
            info!(
                "    Device[{}]: {}:{} ({})",
                i,
                dev.host,
                dev.port,
                if dev.enabled { "enabled" } else { "disabled" }
            );
        }

        info!("  MQTT: {}:{}", self.mqtt.host, self.mqtt.port);
        info!("    Client ID: {}", self.mqtt.client_id);
        if let Some(namespace) = self.mqtt.namespace() {
            info!("    Namespace: {}", namespace);
        }
        info!("    Retain: {}", self.mqtt.retain);

        info!("  Query:");
        info!("    Command: {}", self.query.command);
        info!("    Timeout: {}ms", self.query.timeout.as_millis());
        info!(
            "    Delimiter: {}",
            self.query.delimiter.as_deref().unwrap_or("(none)")
        );

        match self.poll_interval_secs {
            Some(secs) => info!("  Poll Interval: {}s", secs),
            None => info!("  Poll Interval: single cycle"),
        }
        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> Result<()> {
        if self.mqtt.port == 0 {
            bail!("mqtt.port must be between 1 and 65535");
        }
        if self.mqtt.host.is_empty() {
            return Err(anyhow!("config.rs:MQTT host cannot be empty"));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(anyhow!("config.rs:MQTT client_id cannot be empty"));
        }

        for (i, dev) in self.devices.iter().enumerate() {
            if dev.enabled {
                if dev.port == 0 {
                    bail!("devices[{}].port must be between 1 and 65535", i);
                }
                if dev.host.is_empty() {
                    bail!("devices[{}].host cannot be empty", i);
                }
            }
        }
        if !self.devices.iter().any(|d| d.enabled) {
            bail!("at least one enabled device must be configured");
        }

        if self.query.command.is_empty() {
            return Err(anyhow!("config.rs:query.command cannot be empty"));
        }
        if self.query.timeout.is_zero() {
            return Err(anyhow!("config.rs:Invalid query timeout: 0"));
        }
        if self.query.delimiter.as_deref() == Some("") {
            return Err(anyhow!(
                "config.rs:query.delimiter cannot be empty, use null to disable it"
            ));
        }

        if self.poll_interval_secs == Some(0) {
            bail!("poll_interval_secs must be greater than 0");
        }

        Ok(())
    }

    fn default_query() -> Query {
        Query {
            command: Self::default_query_command(),
            timeout: Self::default_query_timeout(),
            delimiter: Self::default_query_delimiter(),
        }
    }

    fn default_query_command() -> String {
        DEFAULT_QUERY_COMMAND.to_string()
    }

    fn default_query_timeout() -> Duration {
        Duration::from_millis(5000)
    }

    fn default_query_delimiter() -> Option<String> {
        Some("}".to_string())
    }

    fn default_device_port() -> u16 {
        DEFAULT_DEVICE_PORT
    }

    fn default_mqtt_port() -> u16 {
        1883
    }

    fn default_mqtt_client_id() -> String {
        "wifibat-bridge".to_string()
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
