//! Message bus port — publish/subscribe towards the backend.
//!
//! Inbound deliveries do not go through this trait: the adapter pushes each
//! [`InboundMessage`] into a `tokio::sync::mpsc` channel whose receiver is
//! handed to the orchestrator, so messages are consumed in delivery order.

use std::future::Future;

use fieldnode_domain::error::NodeError;

/// Delivery guarantee requested for a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Outbound side of the message bus client.
pub trait MessageBus {
    /// Publish `payload` on `topic`.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: Qos,
    ) -> impl Future<Output = Result<(), NodeError>> + Send;

    /// Start receiving messages published on `topic`.
    fn subscribe(
        &self,
        topic: &str,
        qos: Qos,
    ) -> impl Future<Output = Result<(), NodeError>> + Send;

    /// Stop receiving messages published on `topic`.
    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<(), NodeError>> + Send;
}

impl<T: MessageBus + Send + Sync> MessageBus for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: Qos,
    ) -> impl Future<Output = Result<(), NodeError>> + Send {
        (**self).publish(topic, payload, qos)
    }

    fn subscribe(
        &self,
        topic: &str,
        qos: Qos,
    ) -> impl Future<Output = Result<(), NodeError>> + Send {
        (**self).subscribe(topic, qos)
    }

    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<(), NodeError>> + Send {
        (**self).unsubscribe(topic)
    }
}
