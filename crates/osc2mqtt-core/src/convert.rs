//! The engine boundary: bidirectional message translation.
//!
//! Both directions share the same shape: match the inbound identifier,
//! assemble the value sequence, coerce, render the outbound identifier.
//! The MQTT -> OSC direction decodes the payload first; the OSC -> MQTT
//! direction encodes it last.

use indexmap::IndexMap;
use tracing::debug;

use crate::codec;
use crate::coerce;
use crate::error::{ConfigError, ConvertError};
use crate::matcher::RuleSet;
use crate::rule::RuleDefinition;
use crate::template;
use crate::value::Value;

/// An OSC message produced from an MQTT publish.
#[derive(Debug, Clone, PartialEq)]
pub struct OscOutput {
    /// Rendered OSC address.
    pub address: String,
    /// Argument values.
    pub values: Vec<Value>,
    /// Type tags forced by the rule's `osctags` field, one per value.
    /// `None` leaves tag selection to the transport.
    pub tags: Option<Vec<String>>,
}

/// An MQTT publish produced from an OSC message.
#[derive(Debug, Clone, PartialEq)]
pub struct MqttOutput {
    /// Rendered MQTT topic.
    pub topic: String,
    /// Encoded payload.
    pub payload: Vec<u8>,
}

/// Bidirectional converter over one compiled rule set.
///
/// Stateless per call apart from the rule set's match cache, so it can be
/// driven concurrently from both transport directions.
#[derive(Debug)]
pub struct Converter {
    rules: RuleSet,
}

impl Converter {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Compile rule definitions and build a converter over them.
    pub fn compile(definitions: &IndexMap<String, RuleDefinition>) -> Result<Self, ConfigError> {
        Ok(Self::new(RuleSet::compile(definitions)?))
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Translate an MQTT message into an OSC message.
    ///
    /// Returns `Ok(None)` when no rule matches the topic; that is a
    /// normal outcome, not an error.
    pub fn from_mqtt(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Result<Option<OscOutput>, ConvertError> {
        let Some((rule, captures)) = self.rules.match_rule(topic) else {
            return Ok(None);
        };

        // Decode the payload first, then append identifier-derived values.
        let mut values = codec::decode(rule.payload_type, &rule.format, payload)?;
        for gref in &rule.topic_groups {
            values.push(Value::Str(captures.group_ref(gref).to_string()));
        }

        if !rule.from_mqtt.is_empty() {
            values = coerce::coerce(&rule.from_mqtt, values)?;
        }

        let tags = (!rule.osctags.is_empty()).then(|| rule.osctags.clone());
        let address = template::render(&rule.address, &captures, &values);
        debug!(topic, %address, ?values, "translated MQTT -> OSC");
        Ok(Some(OscOutput {
            address,
            values,
            tags,
        }))
    }

    /// Translate an OSC message into an MQTT publish.
    ///
    /// OSC arguments arrive already typed, so only the rule's `type` and
    /// `format` drive the payload encoding.
    pub fn from_osc(
        &self,
        address: &str,
        values: &[Value],
    ) -> Result<Option<MqttOutput>, ConvertError> {
        let Some((rule, captures)) = self.rules.match_rule(address) else {
            return Ok(None);
        };

        let mut values = values.to_vec();
        for gref in &rule.address_groups {
            values.push(Value::Str(captures.group_ref(gref).to_string()));
        }

        if !rule.from_osc.is_empty() {
            values = coerce::coerce(&rule.from_osc, values)?;
        }

        let topic = template::render(&rule.topic, &captures, &values);
        let payload = codec::encode(rule.payload_type, &rule.format, &values)?;
        debug!(address, %topic, len = payload.len(), "translated OSC -> MQTT");
        Ok(Some(MqttOutput { topic, payload }))
    }
}
