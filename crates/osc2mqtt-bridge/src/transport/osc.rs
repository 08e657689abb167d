//! OSC transport over UDP.
//!
//! Listens on the configured port, decodes incoming packets and forwards
//! their messages over an mpsc channel. Sending requires a configured
//! receiver address; without one the bridge runs one-way (OSC -> MQTT).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use osc2mqtt_core::Value;

use crate::config::{parse_hostport, OscSettings};
use crate::error::BridgeError;
use crate::transport::wire;

/// An inbound OSC message.
pub type OscInbound = (String, Vec<Value>);

const DEFAULT_OSC_PORT: u16 = 9000;
const CHANNEL_CAPACITY: usize = 256;
const MAX_PACKET: usize = 65536;

/// Handle to the OSC side of the bridge.
pub struct OscTransport {
    socket: Arc<UdpSocket>,
    receiver: Option<SocketAddr>,
}

impl OscTransport {
    /// Bind the UDP socket and start the receive task.
    pub async fn bind(settings: &OscSettings) -> Result<(Self, mpsc::Receiver<OscInbound>), BridgeError> {
        let socket = Arc::new(UdpSocket::bind(("0.0.0.0", settings.port)).await?);

        let receiver = match &settings.receiver {
            Some(addr) => {
                let (host, port) = parse_hostport(addr, DEFAULT_OSC_PORT);
                let resolved = tokio::net::lookup_host((host.as_str(), port))
                    .await?
                    .next()
                    .ok_or_else(|| BridgeError::BadAddress(addr.clone()))?;
                Some(resolved)
            }
            None => None,
        };

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let recv_socket = Arc::clone(&socket);
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_PACKET];
            loop {
                match recv_socket.recv_from(&mut buf).await {
                    Ok((len, from)) => match wire::decode_packet(&buf[..len]) {
                        Ok(messages) => {
                            for (address, values) in messages {
                                debug!(%address, args = values.len(), "OSC recv");
                                if tx.send((address, values)).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => warn!(%from, error = %e, "dropping malformed OSC packet"),
                    },
                    Err(e) => {
                        warn!(error = %e, "OSC socket receive error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok((Self { socket, receiver }, rx))
    }

    /// Whether a receiver address is configured.
    pub fn has_receiver(&self) -> bool {
        self.receiver.is_some()
    }

    /// Encode and send one OSC message to the configured receiver.
    /// A no-op when no receiver is configured.
    pub async fn send(
        &self,
        address: &str,
        values: &[Value],
        tags: Option<&[String]>,
    ) -> Result<(), BridgeError> {
        let Some(dest) = self.receiver else {
            return Ok(());
        };
        let packet = wire::encode_message(address, values, tags)?;
        self.socket.send_to(&packet, dest).await?;
        Ok(())
    }
}
