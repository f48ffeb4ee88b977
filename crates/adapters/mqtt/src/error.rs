//! MQTT adapter error types.

use fieldnode_domain::error::NodeError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[from] rumqttc::ClientError),
}

impl From<MqttError> for NodeError {
    fn from(err: MqttError) -> Self {
        Self::Bus(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{AsyncClient, MqttOptions, QoS};

    async fn closed_client_error() -> rumqttc::ClientError {
        let (client, eventloop) = AsyncClient::new(MqttOptions::new("test", "localhost", 1883), 1);
        drop(eventloop);
        client
            .publish("up/test", QoS::AtMostOnce, false, Vec::new())
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn should_convert_to_bus_error() {
        let err: NodeError = MqttError::Client(closed_client_error().await).into();
        assert!(matches!(err, NodeError::Bus(_)));
    }

    #[tokio::test]
    async fn should_display_client_error() {
        let err = MqttError::Client(closed_client_error().await);
        assert_eq!(err.to_string(), "MQTT client error");
    }
}
