//! The bridge orchestrator: one dispatch loop over both transports.
//!
//! Per-message failures are logged and the message dropped; they never
//! stop the loop or affect other messages. An identifier matching no rule
//! is a normal, silent outcome.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use osc2mqtt_core::{Converter, Value};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::transport::mqtt::{MqttInbound, MqttTransport};
use crate::transport::osc::{OscInbound, OscTransport};

enum Inbound {
    Mqtt(MqttInbound),
    Osc(OscInbound),
    Closed,
}

/// Message counters reported on shutdown.
#[derive(Debug, Default)]
struct Counters {
    mqtt_to_osc: u64,
    osc_to_mqtt: u64,
    unmatched: u64,
    dropped: u64,
}

pub struct Bridge {
    converter: Converter,
    mqtt: MqttTransport,
    osc: OscTransport,
    mqtt_rx: mpsc::Receiver<MqttInbound>,
    osc_rx: mpsc::Receiver<OscInbound>,
    counters: Counters,
}

impl Bridge {
    /// Compile the rules and bring up both transports.
    pub async fn start(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let converter = Converter::compile(&config.rule_definitions()?)?;
        let (mqtt, mqtt_rx) = MqttTransport::connect(&config.mqtt);
        let (osc, osc_rx) = OscTransport::bind(&config.osc).await?;

        info!(
            rules = converter.rules().len(),
            broker = %config.mqtt.broker,
            osc_port = config.osc.port,
            osc_receiver = config.osc.receiver.as_deref().unwrap_or("none"),
            "bridge started"
        );

        Ok(Self {
            converter,
            mqtt,
            osc,
            mqtt_rx,
            osc_rx,
            counters: Counters::default(),
        })
    }

    /// Run the dispatch loop until either transport closes its channel.
    pub async fn run(mut self) {
        loop {
            let inbound = tokio::select! {
                msg = self.mqtt_rx.recv() => msg.map(Inbound::Mqtt).unwrap_or(Inbound::Closed),
                msg = self.osc_rx.recv() => msg.map(Inbound::Osc).unwrap_or(Inbound::Closed),
            };
            match inbound {
                Inbound::Mqtt((topic, payload)) => self.handle_mqtt(&topic, &payload).await,
                Inbound::Osc((address, values)) => self.handle_osc(&address, &values).await,
                Inbound::Closed => break,
            }
        }
        info!(
            mqtt_to_osc = self.counters.mqtt_to_osc,
            osc_to_mqtt = self.counters.osc_to_mqtt,
            unmatched = self.counters.unmatched,
            dropped = self.counters.dropped,
            "bridge stopped"
        );
    }

    async fn handle_mqtt(&mut self, topic: &str, payload: &[u8]) {
        match self.converter.from_mqtt(topic, payload) {
            Ok(Some(out)) => {
                if self.osc.has_receiver() {
                    debug!(address = %out.address, values = ?out.values, "OSC send");
                    match self.osc.send(&out.address, &out.values, out.tags.as_deref()).await {
                        Ok(()) => self.counters.mqtt_to_osc += 1,
                        Err(e) => {
                            self.counters.dropped += 1;
                            warn!(topic, error = %e, "OSC send failed");
                        }
                    }
                }
            }
            Ok(None) => {
                self.counters.unmatched += 1;
                debug!(topic, "no rule match for MQTT topic");
            }
            Err(e) => {
                self.counters.dropped += 1;
                warn!(topic, error = %e, "dropping MQTT message");
            }
        }
    }

    async fn handle_osc(&mut self, address: &str, values: &[Value]) {
        match self.converter.from_osc(address, values) {
            Ok(Some(out)) => {
                debug!(topic = %out.topic, len = out.payload.len(), "MQTT publish");
                match self.mqtt.publish(&out.topic, out.payload).await {
                    Ok(()) => self.counters.osc_to_mqtt += 1,
                    Err(e) => {
                        self.counters.dropped += 1;
                        warn!(address, error = %e, "MQTT publish failed");
                    }
                }
            }
            Ok(None) => {
                self.counters.unmatched += 1;
                debug!(address, "no rule match for OSC address");
            }
            Err(e) => {
                self.counters.dropped += 1;
                warn!(address, error = %e, "dropping OSC message");
            }
        }
    }
}
