//! MQTT client configuration.

use std::time::Duration;

use rumqttc::MqttOptions;
use serde::Deserialize;

/// Configuration for the MQTT client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier. Defaults to the device id when empty.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Bound of the outgoing request queue.
    pub capacity: usize,
    /// Pause between reconnection attempts, in milliseconds.
    pub reconnect_delay_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: String::new(),
            keep_alive_secs: 30,
            capacity: 10,
            reconnect_delay_ms: 1000,
        }
    }
}

impl MqttConfig {
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Build the `rumqttc` options, using `fallback_id` when no client id is
    /// configured.
    #[must_use]
    pub fn options(&self, fallback_id: &str) -> MqttOptions {
        let client_id = if self.client_id.is_empty() {
            fallback_id
        } else {
            &self.client_id
        };
        let mut options = MqttOptions::new(client_id, &self.broker_host, self.broker_port);
        options.set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs)));
        options.set_clean_session(true);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1883);
        assert!(config.client_id.is_empty());
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.capacity, 10);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(1));
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            broker_host = "mqtt.example.com"
            broker_port = 8883
            client_id = "greenhouse"
            keep_alive_secs = 60
            capacity = 32
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "mqtt.example.com");
        assert_eq!(config.broker_port, 8883);
        assert_eq!(config.client_id, "greenhouse");
        assert_eq!(config.keep_alive_secs, 60);
        assert_eq!(config.capacity, 32);
    }

    #[test]
    fn should_fall_back_to_device_id_as_client_id() {
        let config = MqttConfig::default();
        let options = config.options("240AC4123456");
        assert_eq!(options.client_id(), "240AC4123456");
        assert_eq!(options.broker_address(), ("localhost".to_string(), 1883));
    }

    #[test]
    fn should_prefer_configured_client_id() {
        let config = MqttConfig {
            client_id: "bench-node".to_string(),
            ..MqttConfig::default()
        };
        assert_eq!(config.options("240AC4123456").client_id(), "bench-node");
    }
}
