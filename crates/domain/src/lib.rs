//! # fieldnode-domain
//!
//! Pure domain model for the fieldnode device core.
//!
//! ## Responsibilities
//! - Define **Channels** (typed points of control or observation) and the
//!   ordered **Channel Registry** that owns them
//! - Derive the stable **Device Id** from the hardware address
//! - Describe the channel schema as **Descriptors** for bus registration
//! - Model **Provisioning State** (persisted flags, phases, retry policy)
//! - Define the **Wire Messages** and **Topics** exchanged with the backend
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod channel;
pub mod descriptor;
pub mod device;
pub mod message;
pub mod provisioning;
pub mod registry;
pub mod topic;
