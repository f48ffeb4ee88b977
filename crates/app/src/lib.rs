//! # fieldnode-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `HardwareAddressProvider` — read the factory MAC address
//!   - `FlagStore` — durable namespaced booleans
//!   - `MessageBus` — publish, subscribe, unsubscribe
//!   - `NetworkManager` — credential provisioning and station connection
//!   - `StatusIndicator` — "operational" LED
//! - Provide the **use-cases**:
//!   - `resolve_device_id` — identity from hardware address
//!   - `NetworkEventHandler` — credential retry policy, connectivity flags
//!   - `ProvisioningOrchestrator` — the boot-time provisioning state machine
//!   - `NodeRuntime` — command handling and telemetry once provisioned
//! - Provide **in-process infrastructure** (`Rendezvous`) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `fieldnode-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod identity;
pub mod network;
pub mod ports;
pub mod provisioning;
pub mod rendezvous;
pub mod runtime;
