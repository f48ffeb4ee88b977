use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use fieldnode_app::ports::{FailureReason, NetworkEvent, NetworkManager};
use fieldnode_domain::error::NodeError;

const VIRTUAL_SSID: &str = "fieldnode-virtual";

/// Outcome of one simulated credential attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Fail(FailureReason),
    Succeed,
}

/// Network manager that replays a script of credential attempts.
///
/// Every event is pushed to the channel given at construction, the same way
/// a radio driver would report them from its callback context.
pub struct VirtualNetwork {
    provisioned: AtomicBool,
    script: Mutex<VecDeque<Attempt>>,
    events: mpsc::Sender<NetworkEvent>,
    resets: AtomicUsize,
}

impl VirtualNetwork {
    /// Create a network that already has (`provisioned = true`) or lacks
    /// stored credentials.
    #[must_use]
    pub fn new(provisioned: bool, events: mpsc::Sender<NetworkEvent>) -> Self {
        Self {
            provisioned: AtomicBool::new(provisioned),
            script: Mutex::new(VecDeque::new()),
            events,
            resets: AtomicUsize::new(0),
        }
    }

    /// Queue the attempts replayed by the next provisioning session.
    ///
    /// With an empty script a session succeeds on the first attempt.
    #[must_use]
    pub fn with_attempts(self, attempts: impl IntoIterator<Item = Attempt>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(attempts);
        self
    }

    /// Number of times the credential exchange was reset after failures.
    #[must_use]
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn session(&self) -> Vec<NetworkEvent> {
        let attempts: Vec<Attempt> = {
            let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
            if script.is_empty() {
                vec![Attempt::Succeed]
            } else {
                script.drain(..).collect()
            }
        };

        let mut events = vec![NetworkEvent::ProvisioningStarted];
        for attempt in attempts {
            events.push(NetworkEvent::CredentialsReceived {
                ssid: VIRTUAL_SSID.to_string(),
            });
            match attempt {
                Attempt::Fail(reason) => events.push(NetworkEvent::CredentialFailure(reason)),
                Attempt::Succeed => {
                    self.provisioned.store(true, Ordering::SeqCst);
                    events.push(NetworkEvent::CredentialSuccess);
                    events.push(NetworkEvent::ProvisioningEnded);
                    events.push(NetworkEvent::Connected);
                    break;
                }
            }
        }
        events
    }
}

async fn emit(
    sender: mpsc::Sender<NetworkEvent>,
    events: Vec<NetworkEvent>,
) -> Result<(), NodeError> {
    for event in events {
        sender
            .send(event)
            .await
            .map_err(|err| NodeError::Network(Box::new(err)))?;
    }
    Ok(())
}

impl NetworkManager for VirtualNetwork {
    fn is_provisioned(&self) -> impl Future<Output = Result<bool, NodeError>> + Send {
        let provisioned = self.provisioned.load(Ordering::SeqCst);
        async move { Ok(provisioned) }
    }

    fn start_provisioning(
        &self,
        service_name: &str,
        pop: Option<&str>,
    ) -> impl Future<Output = Result<(), NodeError>> + Send {
        tracing::info!(
            %service_name,
            secured = pop.is_some(),
            "virtual provisioning session opened"
        );
        emit(self.events.clone(), self.session())
    }

    fn connect(&self) -> impl Future<Output = Result<(), NodeError>> + Send {
        tracing::debug!("virtual station connecting");
        emit(self.events.clone(), vec![NetworkEvent::Connected])
    }

    fn reset_credentials(&self) -> impl Future<Output = Result<(), NodeError>> + Send {
        self.resets.fetch_add(1, Ordering::SeqCst);
        tracing::info!("virtual credential exchange reset, waiting for new credentials");
        async { Ok(()) }
    }
}
