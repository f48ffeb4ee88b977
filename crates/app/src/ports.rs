//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod bus;
pub mod flag_store;
pub mod hardware;
pub mod indicator;
pub mod network;

pub use bus::{InboundMessage, MessageBus, Qos};
pub use flag_store::FlagStore;
pub use hardware::HardwareAddressProvider;
pub use indicator::StatusIndicator;
pub use network::{FailureReason, NetworkEvent, NetworkManager};
