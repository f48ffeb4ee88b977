//! [`MessageBus`] implementation over a `rumqttc` client.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use fieldnode_app::ports::{InboundMessage, MessageBus, Qos};
use fieldnode_app::rendezvous::{Flag, Rendezvous};
use fieldnode_domain::error::NodeError;

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Topic filters the broker should currently deliver to this client.
///
/// The client does not replay subscriptions after a reconnect, and a clean
/// session makes the broker forget them, so they are restored from here on
/// every fresh session.
#[derive(Clone, Default)]
struct Subscriptions(Arc<Mutex<HashMap<String, QoS>>>);

impl Subscriptions {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, QoS>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, topic: String, qos: QoS) {
        self.lock().insert(topic, qos);
    }

    fn forget(&self, topic: &str) {
        self.lock().remove(topic);
    }

    fn snapshot(&self) -> Vec<(String, QoS)> {
        self.lock()
            .iter()
            .map(|(topic, qos)| (topic.clone(), *qos))
            .collect()
    }
}

/// Message bus backed by an MQTT broker.
#[derive(Clone)]
pub struct RumqttBus {
    client: AsyncClient,
    subscriptions: Subscriptions,
}

impl RumqttBus {
    /// Create the client without driving it. The returned [`EventLoop`] must
    /// be polled for any request to reach the broker.
    #[must_use]
    pub fn new(config: &MqttConfig, fallback_id: &str) -> (Self, EventLoop) {
        let (client, eventloop) = AsyncClient::new(config.options(fallback_id), config.capacity);
        let bus = Self {
            client,
            subscriptions: Subscriptions::default(),
        };
        (bus, eventloop)
    }

    /// Create the client and drive its event loop on a background task.
    ///
    /// The task raises [`Flag::BusConnected`] on every broker acknowledgement,
    /// restores active subscriptions when the broker starts a fresh session,
    /// clears the flag on connection errors, and forwards incoming publishes
    /// to `inbox`. It stops once `inbox` is closed.
    pub fn connect(
        config: &MqttConfig,
        fallback_id: &str,
        rendezvous: Arc<Rendezvous>,
        inbox: mpsc::Sender<InboundMessage>,
    ) -> (Self, JoinHandle<()>) {
        let (bus, eventloop) = Self::new(config, fallback_id);
        tracing::info!(
            host = %config.broker_host,
            port = config.broker_port,
            "connecting to MQTT broker"
        );
        let session = bus.session(rendezvous, inbox);
        let handle = tokio::spawn(session.drive(eventloop, config.reconnect_delay()));
        (bus, handle)
    }

    /// Topic filters currently subscribed through this bus.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .subscriptions
            .snapshot()
            .into_iter()
            .map(|(topic, _)| topic)
            .collect();
        topics.sort();
        topics
    }

    fn session(
        &self,
        rendezvous: Arc<Rendezvous>,
        inbox: mpsc::Sender<InboundMessage>,
    ) -> Session {
        Session {
            client: self.client.clone(),
            subscriptions: self.subscriptions.clone(),
            rendezvous,
            inbox,
        }
    }
}

impl MessageBus for RumqttBus {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: Qos,
    ) -> impl Future<Output = Result<(), NodeError>> + Send {
        let client = self.client.clone();
        let topic = topic.to_string();
        async move {
            client
                .publish(topic, to_qos(qos), false, payload)
                .await
                .map_err(MqttError::from)?;
            Ok(())
        }
    }

    fn subscribe(
        &self,
        topic: &str,
        qos: Qos,
    ) -> impl Future<Output = Result<(), NodeError>> + Send {
        let client = self.client.clone();
        let subscriptions = self.subscriptions.clone();
        let topic = topic.to_string();
        async move {
            let qos = to_qos(qos);
            client
                .subscribe(topic.clone(), qos)
                .await
                .map_err(MqttError::from)?;
            subscriptions.record(topic, qos);
            Ok(())
        }
    }

    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<(), NodeError>> + Send {
        let client = self.client.clone();
        let topic = topic.to_string();
        self.subscriptions.forget(&topic);
        async move {
            client.unsubscribe(topic).await.map_err(MqttError::from)?;
            Ok(())
        }
    }
}

fn to_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// State shared between the bus handle and the task polling its event loop.
struct Session {
    client: AsyncClient,
    subscriptions: Subscriptions,
    rendezvous: Arc<Rendezvous>,
    inbox: mpsc::Sender<InboundMessage>,
}

impl Session {
    async fn drive(self, mut eventloop: EventLoop, reconnect_delay: Duration) {
        loop {
            match eventloop.poll().await {
                Ok(event) => {
                    if !self.dispatch(event).await {
                        tracing::debug!("inbox closed, stopping MQTT event loop");
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "MQTT connection error, retrying");
                    self.rendezvous.clear(Flag::BusConnected);
                    tokio::time::sleep(reconnect_delay).await;
                }
            }
        }
    }

    /// Apply one event loop notification. Returns `false` once the inbox is gone.
    async fn dispatch(&self, event: Event) -> bool {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                tracing::info!(code = ?ack.code, "MQTT broker connected");
                if !ack.session_present {
                    self.restore_subscriptions();
                }
                self.rendezvous.set(Flag::BusConnected);
            }
            Event::Incoming(Packet::Disconnect) => {
                tracing::info!("MQTT broker disconnected");
                self.rendezvous.clear(Flag::BusConnected);
            }
            Event::Incoming(Packet::Publish(publish)) => {
                tracing::debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "MQTT message received"
                );
                let message = InboundMessage::new(publish.topic, publish.payload.to_vec());
                return self.inbox.send(message).await.is_ok();
            }
            other => tracing::trace!(event = ?other, "MQTT event"),
        }
        true
    }

    /// Queue a subscribe request for every recorded topic. Returns how many
    /// were queued.
    ///
    /// Runs on the task that polls the event loop, so it must not wait for
    /// room in the request channel.
    fn restore_subscriptions(&self) -> usize {
        let mut restored = 0;
        for (topic, qos) in self.subscriptions.snapshot() {
            match self.client.try_subscribe(topic.clone(), qos) {
                Ok(()) => {
                    tracing::debug!(%topic, "MQTT subscription restored");
                    restored += 1;
                }
                Err(err) => {
                    tracing::warn!(%topic, error = %err, "unable to restore MQTT subscription");
                }
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{ConnAck, ConnectReturnCode, Publish};

    const DOWN_PROVISION: &str = "down/provision/240AC4123456";
    const DOWN_COMMAND: &str = "down/command/240AC4123456";

    fn session(inbox: mpsc::Sender<InboundMessage>) -> (RumqttBus, EventLoop, Session) {
        let (bus, eventloop) = RumqttBus::new(&MqttConfig::default(), "240AC4123456");
        let session = bus.session(Arc::new(Rendezvous::new()), inbox);
        (bus, eventloop, session)
    }

    fn connack(session_present: bool) -> Event {
        Event::Incoming(Packet::ConnAck(ConnAck::new(
            ConnectReturnCode::Success,
            session_present,
        )))
    }

    #[test]
    fn should_map_qos_levels() {
        assert_eq!(to_qos(Qos::AtMostOnce), QoS::AtMostOnce);
        assert_eq!(to_qos(Qos::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(to_qos(Qos::ExactlyOnce), QoS::ExactlyOnce);
    }

    #[tokio::test]
    async fn should_raise_bus_connected_on_connack() {
        let (tx, _rx) = mpsc::channel(1);
        let (_bus, _eventloop, session) = session(tx);

        assert!(session.dispatch(connack(false)).await);
        assert!(session.rendezvous.is_set(Flag::BusConnected));

        assert!(session.dispatch(Event::Incoming(Packet::Disconnect)).await);
        assert!(!session.rendezvous.is_set(Flag::BusConnected));
    }

    #[tokio::test]
    async fn should_forward_publish_to_inbox() {
        let (tx, mut rx) = mpsc::channel(1);
        let (_bus, _eventloop, session) = session(tx);

        let payload = br#"{"status":1}"#.to_vec();
        let publish = Publish::new(DOWN_PROVISION, QoS::AtLeastOnce, payload);
        assert!(session.dispatch(Event::Incoming(Packet::Publish(publish))).await);

        let message = rx.recv().await.unwrap();
        assert_eq!(message.topic, DOWN_PROVISION);
        assert_eq!(message.payload, br#"{"status":1}"#);
    }

    #[tokio::test]
    async fn should_stop_when_inbox_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let (_bus, _eventloop, session) = session(tx);

        let publish = Publish::new(DOWN_COMMAND, QoS::AtLeastOnce, Vec::new());
        assert!(!session.dispatch(Event::Incoming(Packet::Publish(publish))).await);
    }

    #[tokio::test]
    async fn should_track_active_subscriptions() {
        let (tx, _rx) = mpsc::channel(1);
        let (bus, _eventloop, _session) = session(tx);

        bus.subscribe(DOWN_PROVISION, Qos::AtLeastOnce).await.unwrap();
        bus.subscribe(DOWN_COMMAND, Qos::AtLeastOnce).await.unwrap();
        assert_eq!(bus.subscriptions(), vec![DOWN_COMMAND, DOWN_PROVISION]);

        bus.unsubscribe(DOWN_PROVISION).await.unwrap();
        assert_eq!(bus.subscriptions(), vec![DOWN_COMMAND]);
    }

    #[tokio::test]
    async fn should_restore_subscriptions_after_reconnect() {
        let (tx, _rx) = mpsc::channel(1);
        let (bus, _eventloop, session) = session(tx);
        bus.subscribe(DOWN_PROVISION, Qos::AtLeastOnce).await.unwrap();

        assert!(session.dispatch(Event::Incoming(Packet::Disconnect)).await);
        assert!(session.dispatch(connack(false)).await);

        assert!(session.rendezvous.is_set(Flag::BusConnected));
        assert_eq!(session.restore_subscriptions(), 1);
    }

    #[tokio::test]
    async fn should_not_restore_unsubscribed_topics() {
        let (tx, _rx) = mpsc::channel(1);
        let (bus, _eventloop, session) = session(tx);
        bus.subscribe(DOWN_PROVISION, Qos::AtLeastOnce).await.unwrap();
        bus.subscribe(DOWN_COMMAND, Qos::AtLeastOnce).await.unwrap();
        bus.unsubscribe(DOWN_PROVISION).await.unwrap();

        assert_eq!(session.restore_subscriptions(), 1);
    }

    #[tokio::test]
    async fn should_fail_to_restore_once_event_loop_dropped() {
        let (tx, _rx) = mpsc::channel(1);
        let (bus, eventloop, session) = session(tx);
        bus.subscribe(DOWN_COMMAND, Qos::AtLeastOnce).await.unwrap();
        drop(eventloop);

        assert_eq!(session.restore_subscriptions(), 0);
    }

    #[tokio::test]
    async fn should_queue_requests_while_event_loop_alive() {
        let (bus, _eventloop) = RumqttBus::new(&MqttConfig::default(), "240AC4123456");

        bus.subscribe(DOWN_PROVISION, Qos::AtLeastOnce).await.unwrap();
        bus.publish("up/provision/240AC4123456", b"{}".to_vec(), Qos::ExactlyOnce)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_report_bus_error_once_event_loop_dropped() {
        let (bus, eventloop) = RumqttBus::new(&MqttConfig::default(), "240AC4123456");
        drop(eventloop);

        let result = bus.unsubscribe("up/provision/240AC4123456").await;
        assert!(matches!(result, Err(NodeError::Bus(_))));
        assert!(bus.subscriptions().is_empty());
    }
}
