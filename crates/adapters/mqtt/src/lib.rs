//! # fieldnode-adapter-mqtt
//!
//! MQTT adapter — connects the device to the backend broker.
//!
//! ## Responsibilities
//! - Implement the `MessageBus` port over a `rumqttc` client
//! - Drive the client event loop on a background task
//! - Raise and clear the `BusConnected` rendezvous flag
//! - Forward every received publish into the orchestrator's inbox
//!
//! ## Dependency rule
//! Same as other adapters: depends on `fieldnode-app` and `fieldnode-domain`.

pub mod bus;
pub mod config;
pub mod error;

pub use bus::RumqttBus;
pub use config::MqttConfig;
pub use error::MqttError;
