//! Persistent flag store port — durable booleans surviving reboot.

use std::future::Future;

use fieldnode_domain::error::NodeError;

/// Namespaced key/value store for persisted flags.
///
/// Implementations are scoped to a single namespace chosen at construction.
/// [`set`](Self::set) must not return `Ok` before the write is durable.
pub trait FlagStore {
    /// Read a flag. `Ok(None)` means the key was never written.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<bool>, NodeError>> + Send;

    /// Durably write a flag.
    fn set(&self, key: &str, value: bool) -> impl Future<Output = Result<(), NodeError>> + Send;
}

impl<T: FlagStore + Send + Sync> FlagStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<bool>, NodeError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: bool) -> impl Future<Output = Result<(), NodeError>> + Send {
        (**self).set(key, value)
    }
}
