//! MQTT topic layout.
//!
//! The device publishes on `up/<action>/<device_id>` and listens on
//! `down/<action>/<device_id>`; the gateway subscribes to
//! `up/+action/+device_id`.

use crate::id::DeviceId;

/// Per-device topic names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Registration request (device → backend).
    pub provision_up: String,
    /// Registration reply (backend → device).
    pub provision_down: String,
    /// Channel writes (backend → device).
    pub command_down: String,
    /// Channel values (device → backend).
    pub telemetry_up: String,
}

impl Topics {
    #[must_use]
    pub fn for_device(id: &DeviceId) -> Self {
        Self {
            provision_up: format!("up/provision/{id}"),
            provision_down: format!("down/provision/{id}"),
            command_down: format!("down/command/{id}"),
            telemetry_up: format!("up/telemetry/{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_topics_from_device_id() {
        let topics = Topics::for_device(&DeviceId::from_mac([0xA4, 0xC1, 0x38, 0x5B, 0x0E, 0xDF]));
        assert_eq!(topics.provision_up, "up/provision/A4C1385B0EDF");
        assert_eq!(topics.provision_down, "down/provision/A4C1385B0EDF");
        assert_eq!(topics.command_down, "down/command/A4C1385B0EDF");
        assert_eq!(topics.telemetry_up, "up/telemetry/A4C1385B0EDF");
    }
}
