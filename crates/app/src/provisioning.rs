//! Provisioning orchestrator — drives the device from factory state to
//! operational state exactly once.
//!
//! Progress is never kept in memory across boots: every run re-derives
//! where to start from the persisted flags, so a crash at any point simply
//! repeats the unfinished phase on the next boot.
//!
//! ```text
//! Cold ──(network not provisioned)──▶ AwaitingNetwork ──▶ NetworkReady
//!   └───(network provisioned)──────────────────────────▶ NetworkReady
//! NetworkReady ──(bus provisioned)──▶ Provisioned
//!   └──(publish descriptor)──▶ AwaitingBusAck ──{"status":1}──▶ Provisioned
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use fieldnode_domain::device::Device;
use fieldnode_domain::error::{NodeError, ProvisioningError};
use fieldnode_domain::message::ProvisionAck;
use fieldnode_domain::provisioning::{BUS_PROVISIONED_KEY, ProvisioningPhase, ProvisioningState};
use fieldnode_domain::topic::Topics;

use crate::ports::{FlagStore, InboundMessage, MessageBus, NetworkManager, Qos, StatusIndicator};
use crate::rendezvous::{Flag, Rendezvous};
use crate::runtime::NodeRuntime;

/// Tunables for the provisioning handshake.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningConfig {
    /// Upper bound on the wait for the registration acknowledgement.
    ///
    /// `None` (the default) waits forever; only a reply or a reboot ends
    /// the wait.
    pub ack_timeout: Option<Duration>,
    /// Proof-of-possession secret handed to the network manager.
    pub pop: Option<String>,
}

/// Sequences network provisioning and bus registration.
pub struct ProvisioningOrchestrator<S, B, N, I> {
    device: Device,
    topics: Topics,
    store: S,
    bus: B,
    network: N,
    indicator: I,
    rendezvous: Arc<Rendezvous>,
    inbox: mpsc::Receiver<InboundMessage>,
    config: ProvisioningConfig,
    phase: ProvisioningPhase,
    state: ProvisioningState,
    ack_deadline: Option<Instant>,
    published: usize,
}

impl<S, B, N, I> ProvisioningOrchestrator<S, B, N, I>
where
    S: FlagStore,
    B: MessageBus,
    N: NetworkManager,
    I: StatusIndicator,
{
    /// Create an orchestrator in the [`Cold`](ProvisioningPhase::Cold) phase.
    ///
    /// `inbox` receives every message the bus adapter delivers; the
    /// orchestrator reads it only while awaiting the acknowledgement.
    pub fn new(
        device: Device,
        store: S,
        bus: B,
        network: N,
        indicator: I,
        rendezvous: Arc<Rendezvous>,
        inbox: mpsc::Receiver<InboundMessage>,
    ) -> Self {
        let topics = Topics::for_device(device.id());
        Self {
            device,
            topics,
            store,
            bus,
            network,
            indicator,
            rendezvous,
            inbox,
            config: ProvisioningConfig::default(),
            phase: ProvisioningPhase::Cold,
            state: ProvisioningState::default(),
            ack_deadline: None,
            published: 0,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ProvisioningConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn phase(&self) -> ProvisioningPhase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[must_use]
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Number of registration requests published by this orchestrator.
    #[must_use]
    pub fn published(&self) -> usize {
        self.published
    }

    /// Run the handshake until the device is provisioned.
    ///
    /// # Errors
    ///
    /// Returns a storage or network error when the persisted flags cannot
    /// be read at boot, a bus error when the registration cannot be sent,
    /// a storage error when the confirmed registration cannot be persisted
    /// (the phase stays [`AwaitingBusAck`](ProvisioningPhase::AwaitingBusAck)),
    /// and [`ProvisioningError`] when the acknowledgement wait times out or
    /// the bus goes away.
    #[tracing::instrument(skip(self), fields(device_id = %self.device.id()))]
    pub async fn run(&mut self) -> Result<ProvisioningPhase, NodeError> {
        loop {
            match self.phase {
                ProvisioningPhase::Cold => self.boot().await?,
                ProvisioningPhase::AwaitingNetwork => self.await_network().await,
                ProvisioningPhase::NetworkReady => self.register().await?,
                ProvisioningPhase::AwaitingBusAck => self.await_ack().await?,
                ProvisioningPhase::Provisioned => return Ok(self.phase),
            }
        }
    }

    /// Feed one inbound message to the state machine.
    ///
    /// Returns `Ok(true)` when this message completed the registration.
    /// Anything else (wrong topic, malformed payload, a status other than
    /// `1`, a duplicate acknowledgement after completion) is logged and
    /// yields `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns the flag store's error when the confirmed registration cannot
    /// be persisted; the phase is left unchanged.
    pub async fn handle_message(&mut self, message: &InboundMessage) -> Result<bool, NodeError> {
        if self.phase != ProvisioningPhase::AwaitingBusAck {
            tracing::debug!(
                topic = %message.topic,
                phase = %self.phase,
                "ignoring message outside of registration"
            );
            return Ok(false);
        }
        if message.topic != self.topics.provision_down {
            tracing::debug!(topic = %message.topic, "ignoring message on unexpected topic");
            return Ok(false);
        }

        let Some(ack) = ProvisionAck::parse(&message.payload) else {
            tracing::warn!(
                payload = %String::from_utf8_lossy(&message.payload),
                "ignoring malformed provisioning reply"
            );
            return Ok(false);
        };
        if !ack.is_accepted() {
            tracing::info!(status = ack.status, "registration not accepted yet");
            return Ok(false);
        }

        self.store.set(BUS_PROVISIONED_KEY, true).await?;
        self.state.bus_provisioned = true;
        tracing::info!("registration acknowledged and persisted");

        for topic in [&self.topics.provision_up, &self.topics.provision_down] {
            if let Err(err) = self.bus.unsubscribe(topic).await {
                tracing::warn!(%topic, error = %err, "failed to unsubscribe");
            }
        }

        self.complete();
        Ok(true)
    }

    /// Hand the device and bus over to the command runtime.
    ///
    /// Meant to be called once [`run`](Self::run) returned.
    pub fn into_runtime(self) -> NodeRuntime<B> {
        NodeRuntime::new(self.device, self.bus, self.inbox)
    }

    async fn boot(&mut self) -> Result<(), NodeError> {
        self.state.network_provisioned = self.network.is_provisioned().await?;
        self.state.bus_provisioned = self
            .store
            .get(BUS_PROVISIONED_KEY)
            .await?
            .unwrap_or(false);
        tracing::info!(
            network_provisioned = self.state.network_provisioned,
            bus_provisioned = self.state.bus_provisioned,
            "persisted provisioning state loaded"
        );

        if self.state.network_provisioned {
            self.network.connect().await?;
            self.transition(ProvisioningPhase::NetworkReady);
        } else {
            let service_name = self.device.service_name();
            self.network
                .start_provisioning(&service_name, self.config.pop.as_deref())
                .await?;
            self.transition(ProvisioningPhase::AwaitingNetwork);
        }
        Ok(())
    }

    async fn await_network(&mut self) {
        self.rendezvous.wait(Flag::NetworkProvisioned).await;
        self.state.network_provisioned = true;
        self.transition(ProvisioningPhase::NetworkReady);
    }

    async fn register(&mut self) -> Result<(), NodeError> {
        if self.state.bus_provisioned {
            tracing::info!("already registered, skipping bus registration");
            self.complete();
            return Ok(());
        }

        self.rendezvous.wait(Flag::BusConnected).await;

        let payload = self
            .device
            .provision_request()
            .to_payload()
            .map_err(|err| NodeError::Bus(Box::new(err)))?;

        self.bus
            .subscribe(&self.topics.provision_down, Qos::AtLeastOnce)
            .await?;
        self.bus
            .publish(&self.topics.provision_up, payload, Qos::ExactlyOnce)
            .await?;
        self.published += 1;
        tracing::info!(
            topic = %self.topics.provision_up,
            channels = self.device.channels().len(),
            "registration request published"
        );

        self.ack_deadline = self
            .config
            .ack_timeout
            .map(|timeout| Instant::now() + timeout);
        self.transition(ProvisioningPhase::AwaitingBusAck);
        Ok(())
    }

    async fn await_ack(&mut self) -> Result<(), NodeError> {
        loop {
            let message = self.next_message().await?;
            if self.handle_message(&message).await? {
                return Ok(());
            }
        }
    }

    async fn next_message(&mut self) -> Result<InboundMessage, ProvisioningError> {
        let received = match (self.ack_deadline, self.config.ack_timeout) {
            (Some(deadline), Some(timeout)) => {
                tokio::time::timeout_at(deadline, self.inbox.recv())
                    .await
                    .map_err(|_| ProvisioningError::AckTimeout(timeout))?
            }
            _ => self.inbox.recv().await,
        };
        received.ok_or(ProvisioningError::BusClosed)
    }

    fn complete(&mut self) {
        self.transition(ProvisioningPhase::Provisioned);
        if self.state.is_operational() {
            self.rendezvous.set(Flag::Operational);
            self.indicator.set_operational(true);
        }
    }

    fn transition(&mut self, next: ProvisioningPhase) {
        tracing::info!(from = %self.phase, to = %next, "provisioning phase changed");
        self.phase = next;
    }
}
