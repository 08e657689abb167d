//! Bridge configuration.
//!
//! Loaded from a TOML file with `[mqtt]` and `[osc]` sections and an
//! ordered `[[rules]]` list. Rule order is significant: the engine is
//! first-match-wins, and the array-of-tables form preserves declaration
//! order.
//!
//! ```toml
//! [mqtt]
//! broker = "localhost:1883"
//! subscriptions = ["home/#"]
//!
//! [osc]
//! port = 9001
//! receiver = "localhost:9000"
//!
//! [[rules]]
//! name = "lights"
//! match = '^/?light/(\d+)$'
//! address = "/light/{0}"
//! type = "struct"
//! format = "B"
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use osc2mqtt_core::{ConfigError, RuleDefinition};

use crate::error::BridgeError;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub mqtt: MqttSettings,
    pub osc: OscSettings,
    pub rules: Vec<NamedRule>,
}

/// MQTT client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    /// Broker address as `host` or `host:port` (default port 1883).
    pub broker: String,

    /// Client ID presented to the broker.
    pub client_id: String,

    /// Username; may be set without a password.
    pub username: Option<String>,

    /// Password.
    pub password: Option<String>,

    /// Keep-alive interval in seconds.
    pub keep_alive: u64,

    /// Topic filters subscribed on connect.
    pub subscriptions: Vec<String>,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker: "localhost:1883".to_string(),
            client_id: "osc2mqtt".to_string(),
            username: None,
            password: None,
            keep_alive: 60,
            subscriptions: vec!["#".to_string()],
        }
    }
}

/// OSC/UDP settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OscSettings {
    /// Local UDP port the OSC server listens on.
    pub port: u16,

    /// Optional OSC receiver as `host` or `host:port` (default port
    /// 9000). Without it the bridge is one-way (OSC -> MQTT only).
    pub receiver: Option<String>,
}

impl Default for OscSettings {
    fn default() -> Self {
        Self {
            port: 9001,
            receiver: None,
        }
    }
}

/// One rule declaration: a unique name plus the raw rule fields.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRule {
    pub name: String,
    #[serde(flatten)]
    pub rule: RuleDefinition,
}

impl BridgeConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| BridgeError::ConfigParse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// The declared rules as the ordered mapping the engine compiles,
    /// rejecting duplicate names.
    pub fn rule_definitions(&self) -> Result<IndexMap<String, RuleDefinition>, ConfigError> {
        let mut defs = IndexMap::with_capacity(self.rules.len());
        for named in &self.rules {
            if defs.insert(named.name.clone(), named.rule.clone()).is_some() {
                return Err(ConfigError::DuplicateRule(named.name.clone()));
            }
        }
        Ok(defs)
    }
}

/// Split `host[:port]`, falling back to `default_port`.
pub fn parse_hostport(addr: &str, default_port: u16) -> (String, u16) {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (addr.to_string(), default_port),
        },
        _ => (addr.to_string(), default_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.mqtt.broker, "localhost:1883");
        assert_eq!(config.mqtt.client_id, "osc2mqtt");
        assert_eq!(config.mqtt.subscriptions, vec!["#"]);
        assert_eq!(config.osc.port, 9001);
        assert!(config.osc.receiver.is_none());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [mqtt]
            broker = "broker.local"
            username = "osc"
            subscriptions = ["home/#", "stage/#"]

            [osc]
            port = 9002
            receiver = "localhost:9000"

            [[rules]]
            name = "lights"
            match = '^/?light/(\d+)$'
            address = "/light/{0}"
            topic = "light/{0}"
            format = "B"

            [[rules]]
            name = "fallback"
            "#,
        )
        .unwrap();

        assert_eq!(config.mqtt.broker, "broker.local");
        assert_eq!(config.mqtt.username.as_deref(), Some("osc"));
        assert_eq!(config.osc.port, 9002);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].name, "lights");
        assert_eq!(config.rules[0].rule.address, "/light/{0}");
        // Undeclared fields of the second rule fall back to defaults.
        assert_eq!(config.rules[1].rule.pattern, "^/?(.*)");
    }

    #[test]
    fn test_rule_order_is_preserved() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [[rules]]
            name = "zebra"

            [[rules]]
            name = "aardvark"
            "#,
        )
        .unwrap();
        let defs = config.rule_definitions().unwrap();
        let names: Vec<&String> = defs.keys().collect();
        assert_eq!(names, ["zebra", "aardvark"]);
    }

    #[test]
    fn test_duplicate_rule_name_rejected() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [[rules]]
            name = "twin"

            [[rules]]
            name = "twin"
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.rule_definitions().unwrap_err(),
            ConfigError::DuplicateRule(name) if name == "twin"
        ));
    }

    #[test]
    fn test_parse_hostport() {
        assert_eq!(parse_hostport("localhost", 1883), ("localhost".into(), 1883));
        assert_eq!(
            parse_hostport("broker.local:8883", 1883),
            ("broker.local".into(), 8883)
        );
        assert_eq!(
            parse_hostport("host:notaport", 1883),
            ("host:notaport".into(), 1883)
        );
    }
}
