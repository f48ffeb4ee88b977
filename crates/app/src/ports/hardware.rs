//! Hardware address port.

use fieldnode_domain::error::BoxError;
use fieldnode_domain::id::MAC_LEN;

/// Supplies the station interface's raw hardware address.
pub trait HardwareAddressProvider {
    /// Read the 6-byte MAC address.
    ///
    /// # Errors
    ///
    /// Returns the underlying failure when the address cannot be read.
    fn mac_address(&self) -> Result<[u8; MAC_LEN], BoxError>;
}
