//! Network event handling — runs in the callback context of the network
//! manager, applies the credential retry policy and raises rendezvous flags.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use fieldnode_domain::error::NodeError;
use fieldnode_domain::provisioning::{CredentialRetry, RetryDecision};

use crate::ports::{NetworkEvent, NetworkManager};
use crate::rendezvous::{Flag, Rendezvous};

/// Reacts to [`NetworkEvent`]s reported by the network manager.
pub struct NetworkEventHandler<N> {
    network: N,
    rendezvous: Arc<Rendezvous>,
    retry: CredentialRetry,
}

impl<N: NetworkManager> NetworkEventHandler<N> {
    pub fn new(network: N, rendezvous: Arc<Rendezvous>) -> Self {
        Self {
            network,
            rendezvous,
            retry: CredentialRetry::default(),
        }
    }

    /// Use a custom retry ceiling instead of the default of three.
    #[must_use]
    pub fn with_retry(mut self, retry: CredentialRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Consecutive credential failures since the last success or reset.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.retry.failures()
    }

    /// Handle a single event.
    ///
    /// # Errors
    ///
    /// Returns the network manager's error if resetting credentials or
    /// reconnecting fails.
    pub async fn handle(&mut self, event: NetworkEvent) -> Result<(), NodeError> {
        match event {
            NetworkEvent::ProvisioningStarted => {
                tracing::info!("network provisioning started");
            }
            NetworkEvent::CredentialsReceived { ssid } => {
                tracing::info!(%ssid, "network credentials received");
            }
            NetworkEvent::CredentialFailure(reason) => match self.retry.record_failure() {
                RetryDecision::Retry { attempt } => {
                    tracing::warn!(%reason, attempt, "network provisioning failed");
                }
                RetryDecision::ResetCredentials => {
                    tracing::warn!(
                        %reason,
                        "network provisioning failed too often, resetting received credentials"
                    );
                    self.network.reset_credentials().await?;
                }
            },
            NetworkEvent::CredentialSuccess => {
                tracing::info!("network provisioning successful");
                self.retry.record_success();
                self.rendezvous.set(Flag::NetworkProvisioned);
            }
            NetworkEvent::ProvisioningEnded => {
                tracing::debug!("network provisioning ended");
            }
            NetworkEvent::Connected => {
                tracing::info!("network connected");
                self.rendezvous.set(Flag::NetworkConnected);
            }
            NetworkEvent::Disconnected => {
                tracing::info!("network disconnected, reconnecting");
                self.rendezvous.clear(Flag::NetworkConnected);
                self.network.connect().await?;
            }
        }
        Ok(())
    }
}

impl<N: NetworkManager + Send + Sync + 'static> NetworkEventHandler<N> {
    /// Consume events from `events` on a background task until the sender
    /// side is dropped.
    pub fn spawn(mut self, mut events: mpsc::Receiver<NetworkEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Err(err) = self.handle(event).await {
                    tracing::error!(error = %err, "failed to handle network event");
                }
            }
            tracing::debug!("network event stream closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FailureReason;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingNetwork {
        resets: AtomicUsize,
        connects: AtomicUsize,
    }

    impl NetworkManager for CountingNetwork {
        fn is_provisioned(&self) -> impl Future<Output = Result<bool, NodeError>> + Send {
            async { Ok(false) }
        }

        fn start_provisioning(
            &self,
            _service_name: &str,
            _pop: Option<&str>,
        ) -> impl Future<Output = Result<(), NodeError>> + Send {
            async { Ok(()) }
        }

        fn connect(&self) -> impl Future<Output = Result<(), NodeError>> + Send {
            self.connects.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        }

        fn reset_credentials(&self) -> impl Future<Output = Result<(), NodeError>> + Send {
            self.resets.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        }
    }

    fn handler() -> (
        NetworkEventHandler<Arc<CountingNetwork>>,
        Arc<CountingNetwork>,
        Arc<Rendezvous>,
    ) {
        let network = Arc::new(CountingNetwork::default());
        let rendezvous = Arc::new(Rendezvous::new());
        let handler = NetworkEventHandler::new(Arc::clone(&network), Arc::clone(&rendezvous));
        (handler, network, rendezvous)
    }

    #[tokio::test]
    async fn should_reset_credentials_after_three_consecutive_failures() {
        let (mut handler, network, _) = handler();

        for _ in 0..3 {
            handler
                .handle(NetworkEvent::CredentialFailure(FailureReason::AuthError))
                .await
                .unwrap();
        }

        assert_eq!(network.resets.load(Ordering::SeqCst), 1);
        assert_eq!(handler.failures(), 0);
    }

    #[tokio::test]
    async fn should_not_reset_when_success_interrupts_failures() {
        let (mut handler, network, rendezvous) = handler();

        handler
            .handle(NetworkEvent::CredentialFailure(FailureReason::ApNotFound))
            .await
            .unwrap();
        handler
            .handle(NetworkEvent::CredentialFailure(FailureReason::ApNotFound))
            .await
            .unwrap();
        handler.handle(NetworkEvent::CredentialSuccess).await.unwrap();
        handler
            .handle(NetworkEvent::CredentialFailure(FailureReason::AuthError))
            .await
            .unwrap();

        assert_eq!(network.resets.load(Ordering::SeqCst), 0);
        assert_eq!(handler.failures(), 1);
        assert!(rendezvous.is_set(Flag::NetworkProvisioned));
    }

    #[tokio::test]
    async fn should_reset_again_on_every_third_failure() {
        let (mut handler, network, _) = handler();

        for _ in 0..6 {
            handler
                .handle(NetworkEvent::CredentialFailure(FailureReason::AuthError))
                .await
                .unwrap();
        }

        assert_eq!(network.resets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_track_connection_flag_and_reconnect() {
        let (mut handler, network, rendezvous) = handler();

        handler.handle(NetworkEvent::Connected).await.unwrap();
        assert!(rendezvous.is_set(Flag::NetworkConnected));

        handler.handle(NetworkEvent::Disconnected).await.unwrap();
        assert!(!rendezvous.is_set(Flag::NetworkConnected));
        assert_eq!(network.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_process_events_from_spawned_task() {
        let (handler, _, rendezvous) = handler();
        let (tx, rx) = mpsc::channel(8);
        let task = handler.spawn(rx);

        tx.send(NetworkEvent::ProvisioningStarted).await.unwrap();
        tx.send(NetworkEvent::CredentialSuccess).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert!(rendezvous.is_set(Flag::NetworkProvisioned));
    }
}
