//! Node runtime — serves channel writes and publishes telemetry once the
//! device is provisioned.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use fieldnode_domain::device::Device;
use fieldnode_domain::error::NodeError;
use fieldnode_domain::message::{CommandMessage, Telemetry};
use fieldnode_domain::topic::Topics;

use crate::ports::{InboundMessage, MessageBus, Qos};

/// Steady-state loop of a provisioned device.
pub struct NodeRuntime<B> {
    device: Mutex<Device>,
    topics: Topics,
    bus: B,
    inbox: mpsc::Receiver<InboundMessage>,
}

impl<B: MessageBus> NodeRuntime<B> {
    pub fn new(device: Device, bus: B, inbox: mpsc::Receiver<InboundMessage>) -> Self {
        let topics = Topics::for_device(device.id());
        Self {
            device: Mutex::new(device),
            topics,
            bus,
            inbox,
        }
    }

    #[must_use]
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Run `f` with shared access to the device.
    pub fn with_device<T>(&self, f: impl FnOnce(&Device) -> T) -> T {
        f(&self.lock())
    }

    /// Subscribe to the command topic.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the subscription cannot be sent.
    pub async fn start(&self) -> Result<(), NodeError> {
        self.bus
            .subscribe(&self.topics.command_down, Qos::AtLeastOnce)
            .await?;
        tracing::info!(topic = %self.topics.command_down, "listening for commands");
        Ok(())
    }

    /// Publish the values of every monitored channel.
    ///
    /// # Errors
    ///
    /// Returns a bus error if encoding or publishing fails.
    pub async fn publish_telemetry(&self) -> Result<(), NodeError> {
        let telemetry = Telemetry {
            channels: self.lock().channels().snapshot(),
        };
        let payload = telemetry
            .to_payload()
            .map_err(|err| NodeError::Bus(Box::new(err)))?;
        self.bus
            .publish(&self.topics.telemetry_up, payload, Qos::AtLeastOnce)
            .await?;
        tracing::debug!(channels = telemetry.channels.len(), "telemetry published");
        Ok(())
    }

    /// Apply one inbound message.
    ///
    /// Every entry of a command is applied independently: invalid writes are
    /// logged and skipped, valid ones take effect. Telemetry is published
    /// when at least one value changed.
    ///
    /// Returns the number of channels written.
    ///
    /// # Errors
    ///
    /// Returns a bus error if the resulting telemetry cannot be published.
    pub async fn handle_message(&self, message: &InboundMessage) -> Result<usize, NodeError> {
        if message.topic != self.topics.command_down {
            tracing::debug!(topic = %message.topic, "ignoring message on unexpected topic");
            return Ok(0);
        }
        let Some(command) = CommandMessage::parse(&message.payload) else {
            tracing::warn!(
                payload = %String::from_utf8_lossy(&message.payload),
                "ignoring malformed command"
            );
            return Ok(0);
        };

        let written = {
            let mut device = self.lock();
            let registry = device.channels_mut();
            let mut written = 0;
            for (name, json) in &command.channels {
                match registry.apply_command(name, json) {
                    Ok(previous) => {
                        tracing::info!(
                            channel = %name,
                            ?previous,
                            value = %json,
                            "channel written"
                        );
                        written += 1;
                    }
                    Err(err) => {
                        tracing::warn!(channel = %name, error = %err, "rejected channel write");
                    }
                }
            }
            written
        };

        if written > 0 {
            self.publish_telemetry().await?;
        }
        Ok(written)
    }

    /// Process inbound messages until the bus adapter goes away.
    ///
    /// # Errors
    ///
    /// Returns the first bus error raised while subscribing or publishing.
    #[tracing::instrument(skip(self), fields(topic = %self.topics.command_down))]
    pub async fn run(mut self) -> Result<(), NodeError> {
        self.start().await?;
        self.publish_telemetry().await?;
        while let Some(message) = self.inbox.recv().await {
            self.handle_message(&message).await?;
        }
        tracing::info!("inbox closed, stopping runtime");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Device> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::Arc;

    use fieldnode_domain::channel::{ChannelKind, ChannelValue, Role};
    use fieldnode_domain::id::DeviceId;

    #[derive(Default)]
    struct CapturingBus {
        published: Mutex<Vec<(String, Vec<u8>)>>,
        subscribed: Mutex<Vec<String>>,
    }

    impl MessageBus for CapturingBus {
        fn publish(
            &self,
            topic: &str,
            payload: Vec<u8>,
            _qos: Qos,
        ) -> impl Future<Output = Result<(), NodeError>> + Send {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload));
            async { Ok(()) }
        }

        fn subscribe(
            &self,
            topic: &str,
            _qos: Qos,
        ) -> impl Future<Output = Result<(), NodeError>> + Send {
            self.subscribed.lock().unwrap().push(topic.to_string());
            async { Ok(()) }
        }

        fn unsubscribe(&self, _topic: &str) -> impl Future<Output = Result<(), NodeError>> + Send {
            async { Ok(()) }
        }
    }

    const COMMAND: &str = "down/command/240AC4123456";

    fn runtime() -> (
        NodeRuntime<Arc<CapturingBus>>,
        Arc<CapturingBus>,
        mpsc::Sender<InboundMessage>,
    ) {
        let mut device = Device::new(
            "greenhouse",
            DeviceId::from_mac([0x24, 0x0A, 0xC4, 0x12, 0x34, 0x56]),
        )
        .unwrap();
        let registry = device.channels_mut();
        registry
            .add_channel("relay", ChannelKind::Bool, Role::MonitorAndControl)
            .unwrap();
        registry
            .add_channel(
                "setpoint",
                ChannelKind::number(10.0, 30.0, 0.5),
                Role::ControlOnly,
            )
            .unwrap();
        registry
            .add_channel(
                "humidity",
                ChannelKind::number(0.0, 100.0, 1.0),
                Role::MonitorOnly,
            )
            .unwrap();

        let bus = Arc::new(CapturingBus::default());
        let (tx, rx) = mpsc::channel(8);
        (NodeRuntime::new(device, Arc::clone(&bus), rx), bus, tx)
    }

    #[tokio::test]
    async fn should_apply_valid_entries_and_skip_invalid_ones() {
        let (runtime, bus, _tx) = runtime();
        let message = InboundMessage::new(
            COMMAND,
            br#"{"channels":{"relay":true,"setpoint":42.0,"humidity":50,"unknown":1}}"#.to_vec(),
        );

        let written = runtime.handle_message(&message).await.unwrap();

        assert_eq!(written, 1);
        runtime.with_device(|device| {
            let channels = device.channels();
            let value = |name: &str| channels.get(name).unwrap().value().clone();
            assert_eq!(value("relay"), ChannelValue::Bool(true));
            assert_eq!(value("setpoint"), ChannelValue::Number(0.0));
            assert_eq!(value("humidity"), ChannelValue::Number(0.0));
        });
        assert_eq!(bus.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_publish_monitored_channels_only() {
        let (runtime, bus, _tx) = runtime();

        runtime.publish_telemetry().await.unwrap();

        let published = bus.published.lock().unwrap();
        let (topic, payload) = &published[0];
        assert_eq!(topic, "up/telemetry/240AC4123456");
        assert_eq!(
            std::str::from_utf8(payload).unwrap(),
            r#"{"channels":{"relay":false,"humidity":0.0}}"#
        );
    }

    #[tokio::test]
    async fn should_not_publish_when_nothing_changed() {
        let (runtime, bus, _tx) = runtime();

        let written = runtime
            .handle_message(&InboundMessage::new(COMMAND, b"not json".to_vec()))
            .await
            .unwrap();
        let other = runtime
            .handle_message(&InboundMessage::new(
                "down/provision/240AC4123456",
                br#"{"channels":{"relay":true}}"#.to_vec(),
            ))
            .await
            .unwrap();

        assert_eq!(written + other, 0);
        assert!(bus.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_subscribe_and_drain_inbox_until_closed() {
        let (runtime, bus, tx) = runtime();
        tx.send(InboundMessage::new(
            COMMAND,
            br#"{"channels":{"setpoint":21.5}}"#.to_vec(),
        ))
        .await
        .unwrap();
        drop(tx);

        runtime.run().await.unwrap();

        assert_eq!(*bus.subscribed.lock().unwrap(), vec![COMMAND.to_string()]);
        assert_eq!(bus.published.lock().unwrap().len(), 2);
    }
}
