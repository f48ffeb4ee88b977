use std::str::FromStr;

use fieldnode_app::ports::HardwareAddressProvider;
use fieldnode_domain::error::{BoxError, IdentityError};
use fieldnode_domain::id::{MAC_LEN, parse_mac};

/// Hardware address fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHardwareAddress([u8; MAC_LEN]);

impl StaticHardwareAddress {
    #[must_use]
    pub fn new(mac: [u8; MAC_LEN]) -> Self {
        Self(mac)
    }
}

impl FromStr for StaticHardwareAddress {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mac(s).map(Self)
    }
}

impl HardwareAddressProvider for StaticHardwareAddress {
    fn mac_address(&self) -> Result<[u8; MAC_LEN], BoxError> {
        Ok(self.0)
    }
}
