//! Channel registry — the ordered set of channels a device exposes.
//!
//! Channels are kept in insertion order; that order is the order in which
//! [`ChannelRegistry::describe`] reports them. Names are unique and
//! case-sensitive. Registries are small (a handful of channels per device),
//! so lookups are linear scans over a `Vec`.

use crate::channel::{Channel, ChannelKind, ChannelValue, Role};
use crate::descriptor::ChannelDescriptor;
use crate::error::ChannelError;

/// Insertion-ordered collection of [`Channel`]s keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new channel holding the zero value for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::DuplicateName`] if `name` is already taken,
    /// or the construction errors of [`Channel::new`]. The registry is
    /// unchanged on error.
    pub fn add_channel(
        &mut self,
        name: impl Into<String>,
        kind: ChannelKind,
        role: Role,
    ) -> Result<(), ChannelError> {
        let name = name.into();
        if self.position(&name).is_some() {
            return Err(ChannelError::DuplicateName(name));
        }
        let channel = Channel::new(name, kind, role)?;
        self.channels.push(channel);
        Ok(())
    }

    /// Remove a channel, returning it if it was present.
    ///
    /// Removing an unknown name is a no-op.
    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        let index = self.position(name)?;
        Some(self.channels.remove(index))
    }

    /// Replace a channel's value, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::UnknownChannel`] when `name` is absent, or the
    /// validation errors of [`Channel::set_value`]. The stored value is
    /// retained on error.
    pub fn set_value(
        &mut self,
        name: &str,
        value: ChannelValue,
    ) -> Result<ChannelValue, ChannelError> {
        self.get_mut(name)?.set_value(value)
    }

    /// Apply a write coming from the backend.
    ///
    /// Unlike [`set_value`](Self::set_value), this honours the channel's
    /// role and accepts the raw JSON value from the command payload.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotWritable`] for monitor-only channels, in
    /// addition to the errors of [`set_value`](Self::set_value) and
    /// [`ChannelKind::value_from_json`].
    pub fn apply_command(
        &mut self,
        name: &str,
        json: &serde_json::Value,
    ) -> Result<ChannelValue, ChannelError> {
        let channel = self.get_mut(name)?;
        if !channel.role().accepts_commands() {
            return Err(ChannelError::NotWritable(name.to_string()));
        }
        let value = channel.kind().value_from_json(name, json)?;
        channel.set_value(value)
    }

    /// Ordered schema of every registered channel, without values.
    #[must_use]
    pub fn describe(&self) -> Vec<ChannelDescriptor> {
        self.channels.iter().map(ChannelDescriptor::from).collect()
    }

    /// Current values of every monitored channel, in registry order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, ChannelValue)> {
        self.channels
            .iter()
            .filter(|channel| channel.role().is_monitored())
            .map(|channel| (channel.name().to_string(), channel.value().clone()))
            .collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.name() == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|channel| channel.name() == name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Channel, ChannelError> {
        self.channels
            .iter_mut()
            .find(|channel| channel.name() == name)
            .ok_or_else(|| ChannelError::UnknownChannel(name.to_string()))
    }
}

impl<'a> IntoIterator for &'a ChannelRegistry {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}
