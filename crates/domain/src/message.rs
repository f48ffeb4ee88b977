//! Wire messages exchanged with the backend over the message bus.
//!
//! | Message | Direction | Shape |
//! |---------|-----------|-------|
//! | [`ProvisionRequest`] | up | `{"device_name", "device_id", "channels": [descriptor, …]}` |
//! | [`ProvisionAck`] | down | `{"status": <number>}` — `1` means accepted |
//! | [`CommandMessage`] | down | `{"channels": {"<name>": <value>, …}}` |
//! | [`Telemetry`] | up | `{"channels": {"<name>": <value>, …}}` |

use serde::Serialize;
use serde::ser::{SerializeMap, SerializeStruct, Serializer};
use serde_json::{Map, Value};

use crate::channel::ChannelValue;
use crate::descriptor::ChannelDescriptor;
use crate::id::DeviceId;

/// Status value the backend sends once registration is accepted.
pub const ACK_ACCEPTED: f64 = 1.0;

/// Registration message published on the upstream provisioning topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionRequest {
    pub device_name: String,
    pub device_id: DeviceId,
    pub channels: Vec<ChannelDescriptor>,
}

impl ProvisionRequest {
    /// Encode as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if encoding fails.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Reply received on the downstream provisioning topic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProvisionAck {
    pub status: f64,
}

impl ProvisionAck {
    /// Parse a reply payload.
    ///
    /// Returns `None` for anything that is not a JSON object with a numeric
    /// `status` field; such payloads are noise, not errors.
    #[must_use]
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let status = parse_object(payload)?.get("status")?.as_f64()?;
        Some(Self { status })
    }

    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_accepted(&self) -> bool {
        self.status == ACK_ACCEPTED
    }
}

/// Write request received on the downstream command topic.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMessage {
    pub channels: Map<String, Value>,
}

impl CommandMessage {
    /// Parse a command payload, returning `None` when it does not match the
    /// expected shape.
    #[must_use]
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match parse_object(payload)?.remove("channels")? {
            Value::Object(channels) => Some(Self { channels }),
            _ => None,
        }
    }
}

// Only a top-level object counts: derived struct decoding would also take
// the array form, so `[1]` would read as `{"status": 1}`.
fn parse_object(payload: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice(payload).ok()? {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

/// Snapshot of channel values published on the upstream telemetry topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub channels: Vec<(String, ChannelValue)>,
}

impl Telemetry {
    /// Encode as compact JSON, keeping channel order.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if encoding fails.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl Serialize for Telemetry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Values<'a>(&'a [(String, ChannelValue)]);

        impl Serialize for Values<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (name, value) in self.0 {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("Telemetry", 1)?;
        state.serialize_field("channels", &Values(&self.channels))?;
        state.end()
    }
}
