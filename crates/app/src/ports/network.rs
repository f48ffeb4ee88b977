//! Network credential manager port.
//!
//! The manager runs the credential exchange over the short-range pairing
//! transport and joins the wireless network. The core never drives the
//! exchange itself: it starts it, reacts to its [`NetworkEvent`]s and, when
//! the retry ceiling is hit, asks it to discard partial credentials.

use std::future::Future;

use fieldnode_domain::error::NodeError;

/// Why a credential exchange attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The access point rejected the credentials.
    AuthError,
    /// The access point could not be found.
    ApNotFound,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthError => f.write_str("station authentication failed"),
            Self::ApNotFound => f.write_str("access point not found"),
        }
    }
}

/// Events reported by the network manager, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    ProvisioningStarted,
    CredentialsReceived { ssid: String },
    CredentialFailure(FailureReason),
    CredentialSuccess,
    ProvisioningEnded,
    Connected,
    Disconnected,
}

/// Control surface of the network credential manager.
pub trait NetworkManager {
    /// Whether credentials are already stored.
    fn is_provisioned(&self) -> impl Future<Output = Result<bool, NodeError>> + Send;

    /// Start advertising `service_name` and accept credentials, optionally
    /// protected by a proof-of-possession secret.
    fn start_provisioning(
        &self,
        service_name: &str,
        pop: Option<&str>,
    ) -> impl Future<Output = Result<(), NodeError>> + Send;

    /// Join the network with the stored credentials.
    fn connect(&self) -> impl Future<Output = Result<(), NodeError>> + Send;

    /// Discard partially received credentials and re-arm for a fresh attempt.
    fn reset_credentials(&self) -> impl Future<Output = Result<(), NodeError>> + Send;
}

impl<T: NetworkManager + Send + Sync> NetworkManager for std::sync::Arc<T> {
    fn is_provisioned(&self) -> impl Future<Output = Result<bool, NodeError>> + Send {
        (**self).is_provisioned()
    }

    fn start_provisioning(
        &self,
        service_name: &str,
        pop: Option<&str>,
    ) -> impl Future<Output = Result<(), NodeError>> + Send {
        (**self).start_provisioning(service_name, pop)
    }

    fn connect(&self) -> impl Future<Output = Result<(), NodeError>> + Send {
        (**self).connect()
    }

    fn reset_credentials(&self) -> impl Future<Output = Result<(), NodeError>> + Send {
        (**self).reset_credentials()
    }
}
