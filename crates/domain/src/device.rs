//! Device — the root aggregate: identity plus the channel registry.

use crate::error::ChannelError;
use crate::id::DeviceId;
use crate::message::ProvisionRequest;
use crate::registry::ChannelRegistry;

/// Prefix of the name advertised while waiting for network credentials.
pub const SERVICE_NAME_PREFIX: &str = "PROV_";

/// The device this process runs on.
///
/// Created once at startup and owned by the top-level control flow for the
/// lifetime of the process.
#[derive(Debug, Clone)]
pub struct Device {
    name: String,
    id: DeviceId,
    channels: ChannelRegistry,
}

impl Device {
    /// Create a device with an empty channel registry.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::EmptyName`] when `name` is empty.
    pub fn new(name: impl Into<String>, id: DeviceId) -> Result<Self, ChannelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ChannelError::EmptyName);
        }
        Ok(Self {
            name,
            id,
            channels: ChannelRegistry::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    #[must_use]
    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut ChannelRegistry {
        &mut self.channels
    }

    /// Name advertised by the pairing transport, e.g. `PROV_A4C1385B0EDF`.
    #[must_use]
    pub fn service_name(&self) -> String {
        format!("{SERVICE_NAME_PREFIX}{}", self.id)
    }

    /// Registration message announcing this device and its channel schema.
    #[must_use]
    pub fn provision_request(&self) -> ProvisionRequest {
        ProvisionRequest {
            device_name: self.name.clone(),
            device_id: self.id.clone(),
            channels: self.channels.describe(),
        }
    }
}
