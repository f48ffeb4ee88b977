//! # fieldnode-adapter-virtual
//!
//! Virtual board support that lets the device core run on a host machine.
//!
//! ## Provided adapters
//!
//! | Adapter | Port | Behaviour |
//! |---------|------|-----------|
//! | `VirtualNetwork` | `NetworkManager` | Replays scripted credential attempts as network events |
//! | `StaticHardwareAddress` | `HardwareAddressProvider` | Returns a configured MAC address |
//! | `LogIndicator` | `StatusIndicator` | Logs operational state changes |
//!
//! ## Dependency rule
//!
//! Depends on `fieldnode-app` (port traits) and `fieldnode-domain` only.

mod hardware;
mod indicator;
mod network;

pub use hardware::StaticHardwareAddress;
pub use indicator::LogIndicator;
pub use network::{Attempt, VirtualNetwork};
