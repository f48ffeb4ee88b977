//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `fieldnode.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use fieldnode_adapter_mqtt::MqttConfig;
use fieldnode_adapter_virtual::Attempt;
use fieldnode_app::ports::FailureReason;
use fieldnode_app::provisioning::ProvisioningConfig;
use fieldnode_domain::channel::{ChannelKind, Role};
use fieldnode_domain::device::Device;
use fieldnode_domain::error::ChannelError;
use fieldnode_domain::id::{DeviceId, parse_mac};
use fieldnode_domain::provisioning::DEFAULT_NAMESPACE;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device identity settings.
    pub device: DeviceConfig,
    /// Simulated network manager settings.
    pub network: NetworkConfig,
    /// MQTT broker settings.
    pub mqtt: MqttConfig,
    /// Flag store settings.
    pub storage: StorageConfig,
    /// Provisioning handshake settings.
    pub provisioning: ProvisioningSettings,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// The device's fixed channel set, in registration order.
    pub channels: Vec<ChannelConfig>,
}

/// Device identity.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Human-readable device name sent at registration.
    pub name: String,
    /// Simulated hardware address (`AA:BB:CC:DD:EE:FF`).
    pub mac: String,
}

/// Behaviour of the virtual network manager.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whether credentials are already stored at boot.
    pub provisioned: bool,
    /// Rejected credential attempts before the exchange succeeds.
    pub failed_attempts: u32,
}

/// `SQLite` flag store configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `SQLite` connection URL or file path.
    pub database_url: String,
    /// Namespace the provisioning flags are stored under.
    pub namespace: String,
}

/// Provisioning handshake configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProvisioningSettings {
    /// Give up waiting for the registration reply after this many seconds.
    pub ack_timeout_secs: Option<u64>,
    /// Proof-of-possession secret for the credential exchange.
    pub pop: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// One `[[channels]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub role: Role,
    #[serde(flatten)]
    pub kind: ChannelKind,
}

impl Config {
    /// Load configuration from `fieldnode.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("fieldnode.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("FIELDNODE_DEVICE_NAME") {
            self.device.name = val;
        }
        if let Some(val) = lookup("FIELDNODE_MAC") {
            self.device.mac = val;
        }
        if let Some(val) = lookup("FIELDNODE_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(port) = lookup("FIELDNODE_MQTT_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.broker_port = port;
        }
        if let Some(val) = lookup("FIELDNODE_DATABASE_URL") {
            self.storage.database_url = val;
        }
        if let Some(secs) = lookup("FIELDNODE_ACK_TIMEOUT_SECS").and_then(|val| val.parse().ok()) {
            self.provisioning.ack_timeout_secs = Some(secs);
        }
        if let Some(val) = lookup("FIELDNODE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt port must be non-zero".to_string(),
            ));
        }
        if self.device.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "device name must not be empty".to_string(),
            ));
        }
        if parse_mac(&self.device.mac).is_err() {
            return Err(ConfigError::Validation(format!(
                "invalid device mac address {:?}",
                self.device.mac
            )));
        }
        Ok(())
    }

    /// Build the device and register the configured channels, in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ChannelError`] raised by a channel entry.
    pub fn build_device(&self, id: DeviceId) -> Result<Device, ChannelError> {
        let mut device = Device::new(self.device.name.clone(), id)?;
        let registry = device.channels_mut();
        for channel in &self.channels {
            registry.add_channel(channel.name.clone(), channel.kind.clone(), channel.role)?;
        }
        Ok(device)
    }

    #[must_use]
    pub fn provisioning_config(&self) -> ProvisioningConfig {
        ProvisioningConfig {
            ack_timeout: self.provisioning.ack_timeout_secs.map(Duration::from_secs),
            pop: self.provisioning.pop.clone(),
        }
    }
}

impl NetworkConfig {
    /// Script replayed by the virtual network on the first session.
    pub fn attempts(&self) -> impl Iterator<Item = Attempt> {
        (0..self.failed_attempts)
            .map(|_| Attempt::Fail(FailureReason::AuthError))
            .chain(std::iter::once(Attempt::Succeed))
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "fieldnode".to_string(),
            mac: "02:00:00:00:00:01".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:fieldnode.db?mode=rwc".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fieldnoded=info,fieldnode=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
