//! MQTT transport using rumqttc.
//!
//! The event loop runs in a spawned task: it subscribes to the configured
//! topic filters whenever a connection is (re-)established and forwards
//! inbound publishes over an mpsc channel. rumqttc re-establishes the
//! connection on the next poll after an error.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::{parse_hostport, MqttSettings};
use crate::error::BridgeError;

/// An inbound MQTT publish.
pub type MqttInbound = (String, Vec<u8>);

const DEFAULT_MQTT_PORT: u16 = 1883;
const CHANNEL_CAPACITY: usize = 256;

/// Handle to the MQTT side of the bridge.
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    /// Start the MQTT client and its event loop task.
    ///
    /// Returns the transport handle and the channel of inbound publishes.
    pub fn connect(settings: &MqttSettings) -> (Self, mpsc::Receiver<MqttInbound>) {
        let (host, port) = parse_hostport(&settings.broker, DEFAULT_MQTT_PORT);
        let mut options = MqttOptions::new(&settings.client_id, host, port);
        options.set_keep_alive(Duration::from_secs(settings.keep_alive));
        match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                options.set_credentials(username, password);
            }
            (Some(username), None) => {
                options.set_credentials(username, "");
            }
            _ => {}
        }

        let (client, mut event_loop) = AsyncClient::new(options, CHANNEL_CAPACITY);
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let subscriptions = settings.subscriptions.clone();
        let subscriber = client.clone();
        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        debug!(code = ?ack.code, "MQTT connected");
                        for filter in &subscriptions {
                            if let Err(e) = subscriber.subscribe(filter, QoS::AtMostOnce).await {
                                warn!(filter = %filter, error = %e, "MQTT subscribe failed");
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        debug!(topic = %publish.topic, len = publish.payload.len(), "MQTT recv");
                        if tx
                            .send((publish.topic, publish.payload.to_vec()))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "MQTT connection error, retrying");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        (Self { client }, rx)
    }

    /// Publish a payload (QoS 0, not retained).
    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BridgeError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await?;
        Ok(())
    }
}
