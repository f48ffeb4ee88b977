//! Channel — a named, typed point of control or observation on the device.
//!
//! A channel's [`ChannelKind`] is fixed at construction. Its current
//! [`ChannelValue`] is private and only replaced through
//! [`Channel::set_value`], which checks that the value's tag matches the
//! kind. A channel holding a mismatched value cannot be built.

mod kind;
mod value;

pub use kind::{ChannelKind, KindTag, STEP_EPSILON};
pub use value::ChannelValue;

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Whether a channel is observed, controlled, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    MonitorOnly,
    ControlOnly,
    MonitorAndControl,
}

impl Role {
    /// Whether the backend may write to a channel with this role.
    #[must_use]
    pub fn accepts_commands(self) -> bool {
        matches!(self, Self::ControlOnly | Self::MonitorAndControl)
    }

    /// Whether the channel's value is reported in telemetry.
    #[must_use]
    pub fn is_monitored(self) -> bool {
        matches!(self, Self::MonitorOnly | Self::MonitorAndControl)
    }
}

/// A single channel definition together with its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    name: String,
    role: Role,
    kind: ChannelKind,
    value: ChannelValue,
}

impl Channel {
    /// Create a channel holding the zero value for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::EmptyName`] when `name` is empty and
    /// [`ChannelError::InvalidKind`] when the kind's bounds or options are
    /// malformed.
    pub fn new(
        name: impl Into<String>,
        kind: ChannelKind,
        role: Role,
    ) -> Result<Self, ChannelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ChannelError::EmptyName);
        }
        kind.validate(&name)?;
        let value = kind.zero_value();
        Ok(Self {
            name,
            role,
            kind,
            value,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn kind(&self) -> &ChannelKind {
        &self.kind
    }

    #[must_use]
    pub fn value(&self) -> &ChannelValue {
        &self.value
    }

    /// Check that `value` could be stored in this channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::TypeMismatch`], [`ChannelError::OutOfRange`] or
    /// [`ChannelError::InvalidOption`] depending on what is wrong.
    pub fn check(&self, value: &ChannelValue) -> Result<(), ChannelError> {
        self.kind.check(&self.name, value)
    }

    /// Replace the stored value, returning the previous one.
    ///
    /// On error the stored value is left untouched.
    ///
    /// # Errors
    ///
    /// See [`Channel::check`].
    pub fn set_value(&mut self, value: ChannelValue) -> Result<ChannelValue, ChannelError> {
        self.check(&value)?;
        Ok(std::mem::replace(&mut self.value, value))
    }
}
