//! Identity resolver — derives the device id from the hardware address.

use fieldnode_domain::error::IdentityError;
use fieldnode_domain::id::DeviceId;

use crate::ports::HardwareAddressProvider;

/// Read the hardware address and format it as the device id.
///
/// # Errors
///
/// Returns [`IdentityError::AddressUnavailable`] when the provider fails.
/// Callers treat this as fatal at startup.
pub fn resolve_device_id(
    provider: &impl HardwareAddressProvider,
) -> Result<DeviceId, IdentityError> {
    let mac = provider
        .mac_address()
        .map_err(IdentityError::AddressUnavailable)?;
    let id = DeviceId::from_mac(mac);
    tracing::debug!(device_id = %id, "device identity resolved");
    Ok(id)
}
