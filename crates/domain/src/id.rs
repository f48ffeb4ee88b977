//! Device identifier derived from the hardware network address.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Number of bytes in a hardware (MAC) address.
pub const MAC_LEN: usize = 6;

/// Stable device identifier: the MAC address as 12 uppercase hex digits,
/// zero-padded per byte, no separators (e.g. `A4C1385B0EDF`).
///
/// Recomputed identically on every boot; never persisted, never random.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Derive the identifier from a raw hardware address.
    #[must_use]
    pub fn from_mac(mac: [u8; MAC_LEN]) -> Self {
        Self(format!(
            "{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == MAC_LEN * 2
            && s
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(IdentityError::InvalidDeviceId(s.to_string()))
        }
    }
}

impl TryFrom<String> for DeviceId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// Parse a colon- or dash-separated MAC address (`AA:BB:CC:DD:EE:FF`).
///
/// # Errors
///
/// Returns [`IdentityError::InvalidAddress`] unless the input holds exactly
/// six two-digit hex groups.
pub fn parse_mac(input: &str) -> Result<[u8; MAC_LEN], IdentityError> {
    let invalid = || IdentityError::InvalidAddress(input.to_string());
    let mut mac = [0u8; MAC_LEN];
    let mut groups = input.split([':', '-']);
    for byte in &mut mac {
        let group = groups.next().ok_or_else(invalid)?;
        if group.len() != 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        *byte = u8::from_str_radix(group, 16).map_err(|_| invalid())?;
    }
    if groups.next().is_some() {
        return Err(invalid());
    }
    Ok(mac)
}
