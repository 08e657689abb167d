//! Error types for the bridge daemon.

use std::path::PathBuf;

use crate::transport::wire::WireError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("cannot read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error(transparent)]
    Rules(#[from] osc2mqtt_core::ConfigError),

    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("OSC socket error: {0}")]
    Socket(#[from] std::io::Error),

    #[error("OSC encoding error: {0}")]
    Wire(#[from] WireError),

    #[error("cannot resolve address '{0}'")]
    BadAddress(String),
}
