//! Bridge daemon between an MQTT broker and OSC peers over UDP.
//!
//! Translation itself lives in `osc2mqtt-core`; this crate supplies the
//! plumbing around it: TOML configuration, the rumqttc client, the OSC
//! UDP server/sender with its wire codec, and the dispatch loop.

pub mod bridge;
pub mod config;
pub mod error;
pub mod transport;

pub use bridge::Bridge;
pub use config::{BridgeConfig, MqttSettings, OscSettings};
pub use error::BridgeError;
