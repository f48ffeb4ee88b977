//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`NodeError`]
//! via `#[from]`. Adapter failures travel as boxed sources in the
//! [`NodeError::Storage`], [`NodeError::Bus`] and [`NodeError::Network`]
//! variants.

use crate::channel::KindTag;

/// Boxed error source carried across port boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for the fieldnode core.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// A channel configuration or write was rejected.
    #[error("channel error")]
    Channel(#[from] ChannelError),

    /// The device identity could not be established.
    #[error("identity error")]
    Identity(#[from] IdentityError),

    /// The provisioning handshake could not complete.
    #[error("provisioning error")]
    Provisioning(#[from] ProvisioningError),

    /// The persistent flag store failed.
    #[error("storage error")]
    Storage(#[source] BoxError),

    /// The message bus client failed.
    #[error("message bus error")]
    Bus(#[source] BoxError),

    /// The network credential manager failed.
    #[error("network error")]
    Network(#[source] BoxError),
}

/// Errors raised by the channel registry.
///
/// These are caller errors: they are returned synchronously and never abort
/// the process.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    /// A channel name must not be empty.
    #[error("channel name must not be empty")]
    EmptyName,

    /// A channel with this name is already registered.
    #[error("channel {0:?} already exists")]
    DuplicateName(String),

    /// No channel with this name is registered.
    #[error("unknown channel {0:?}")]
    UnknownChannel(String),

    /// The value's type does not match the channel's kind.
    #[error("channel {name:?} expects a {expected} value, got {actual}")]
    TypeMismatch {
        name: String,
        expected: KindTag,
        actual: KindTag,
    },

    /// A number outside `[min, max]` or not aligned to `step`.
    #[error("value {value} is out of range for channel {name:?}")]
    OutOfRange { name: String, value: f64 },

    /// A choice that is not one of the channel's options.
    #[error("{option:?} is not an option of channel {name:?}")]
    InvalidOption { name: String, option: String },

    /// The kind definition itself is malformed.
    #[error("invalid definition for channel {name:?}: {reason}")]
    InvalidKind { name: String, reason: &'static str },

    /// A structured JSON value (array, object, null) was written to a
    /// scalar channel.
    #[error("channel {0:?} cannot hold a structured value")]
    UnsupportedValue(String),

    /// The channel does not accept external writes.
    #[error("channel {0:?} is monitor-only")]
    NotWritable(String),
}

/// Errors raised while resolving the device identity.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The hardware address provider could not supply an address.
    #[error("hardware address unavailable")]
    AddressUnavailable(#[source] BoxError),

    /// A device id string is not 12 uppercase hex characters.
    #[error("invalid device id {0:?}")]
    InvalidDeviceId(String),

    /// A MAC address string could not be parsed.
    #[error("invalid hardware address {0:?}")]
    InvalidAddress(String),
}

/// Errors raised by the provisioning orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    /// No acknowledgement arrived within the configured bound.
    #[error("no provisioning acknowledgement after {0:?}")]
    AckTimeout(std::time::Duration),

    /// The inbound message stream closed while awaiting an acknowledgement.
    #[error("message bus closed while awaiting acknowledgement")]
    BusClosed,
}
