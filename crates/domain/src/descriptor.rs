//! Channel descriptors — the provisioning-time schema of a channel.
//!
//! A descriptor carries name, role and kind but never the current value.
//! It serializes as a single-key object so the backend can index channels
//! by name:
//!
//! ```json
//! { "temp": { "command": true, "type": "number", "min": 20.0, "max": 30.0, "multipleof": 1.0 } }
//! ```

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::channel::{Channel, ChannelKind, Role};

/// Schema entry for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    pub name: String,
    pub role: Role,
    pub kind: ChannelKind,
}

impl From<&Channel> for ChannelDescriptor {
    fn from(channel: &Channel) -> Self {
        Self {
            name: channel.name().to_string(),
            role: channel.role(),
            kind: channel.kind().clone(),
        }
    }
}

impl Serialize for ChannelDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut outer = serializer.serialize_map(Some(1))?;
        outer.serialize_entry(&self.name, &Schema(self))?;
        outer.end()
    }
}

struct Schema<'a>(&'a ChannelDescriptor);

impl Serialize for Schema<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let descriptor = self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("command", &descriptor.role.accepts_commands())?;
        map.serialize_entry("type", descriptor.kind.tag().as_str())?;
        match &descriptor.kind {
            ChannelKind::Number { min, max, step } => {
                map.serialize_entry("min", min)?;
                map.serialize_entry("max", max)?;
                map.serialize_entry("multipleof", step)?;
            }
            ChannelKind::Choice { options } => {
                map.serialize_entry("enum", options)?;
            }
            ChannelKind::Bool | ChannelKind::String => {}
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn describe(name: &str, kind: ChannelKind, role: Role) -> serde_json::Value {
        let channel = Channel::new(name, kind, role).unwrap();
        serde_json::to_value(ChannelDescriptor::from(&channel)).unwrap()
    }

    #[test]
    fn should_serialize_bool_channel() {
        let value = describe("relay01", ChannelKind::Bool, Role::ControlOnly);
        assert_eq!(
            value,
            json!({"relay01": {"command": true, "type": "boolean"}})
        );
    }

    #[test]
    fn should_serialize_number_bounds() {
        let value = describe(
            "temp",
            ChannelKind::number(20.0, 30.0, 1.0),
            Role::MonitorAndControl,
        );
        assert_eq!(
            value,
            json!({"temp": {
                "command": true,
                "type": "number",
                "min": 20.0,
                "max": 30.0,
                "multipleof": 1.0
            }})
        );
    }

    #[test]
    fn should_serialize_choice_options_in_order() {
        let value = describe(
            "mode",
            ChannelKind::choice(["mode1", "mode2"]),
            Role::MonitorAndControl,
        );
        assert_eq!(
            value,
            json!({"mode": {"command": true, "type": "choice", "enum": ["mode1", "mode2"]}})
        );
    }

    #[test]
    fn should_mark_monitor_only_channel_as_not_commandable() {
        let value = describe("something_else", ChannelKind::String, Role::MonitorOnly);
        assert_eq!(
            value,
            json!({"something_else": {"command": false, "type": "string"}})
        );
    }

    #[test]
    fn should_not_include_current_value() {
        let mut channel = Channel::new("relay", ChannelKind::Bool, Role::ControlOnly).unwrap();
        channel
            .set_value(crate::channel::ChannelValue::Bool(true))
            .unwrap();
        let value = serde_json::to_value(ChannelDescriptor::from(&channel)).unwrap();
        assert!(value["relay"].get("value").is_none());
    }
}
