//! Event rendezvous — level-triggered flags shared between the main flow and
//! adapter callback tasks.
//!
//! Adapter tasks [`set`](Rendezvous::set) a flag when something happened
//! (network joined, broker connected, …); the orchestrator
//! [`wait`](Rendezvous::wait)s for it. Flags stay set until explicitly
//! [`clear`](Rendezvous::clear)ed, so a waiter arriving late returns
//! immediately.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::watch;

/// Conditions the orchestrator can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// The network manager reported stored, working credentials.
    NetworkProvisioned,
    /// The station joined the network and got an address.
    NetworkConnected,
    /// The message bus client is connected to the broker.
    BusConnected,
    /// Both provisioning phases are complete.
    Operational,
}

/// A set of named binary flags with blocking waits.
#[derive(Debug)]
pub struct Rendezvous {
    flags: watch::Sender<HashSet<Flag>>,
}

impl Default for Rendezvous {
    fn default() -> Self {
        let (flags, _) = watch::channel(HashSet::new());
        Self { flags }
    }
}

impl Rendezvous {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `flag` and wake every task waiting on it.
    pub fn set(&self, flag: Flag) {
        if self.flags.send_if_modified(|flags| flags.insert(flag)) {
            tracing::debug!(?flag, "rendezvous flag set");
        }
    }

    /// Clear `flag`. Tasks already woken are unaffected.
    pub fn clear(&self, flag: Flag) {
        if self.flags.send_if_modified(|flags| flags.remove(&flag)) {
            tracing::debug!(?flag, "rendezvous flag cleared");
        }
    }

    #[must_use]
    pub fn is_set(&self, flag: Flag) -> bool {
        self.flags.borrow().contains(&flag)
    }

    /// Suspend until `flag` is set. Returns immediately if it already is.
    pub async fn wait(&self, flag: Flag) {
        let mut rx = self.flags.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|flags| flags.contains(&flag)).await;
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    ///
    /// Returns whether the flag was set in time.
    pub async fn wait_timeout(&self, flag: Flag, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait(flag)).await.is_ok()
    }
}
