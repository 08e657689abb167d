//! Transport bindings: MQTT broker client and OSC-over-UDP peer.

pub mod mqtt;
pub mod osc;
pub mod wire;

pub use mqtt::MqttTransport;
pub use osc::OscTransport;
