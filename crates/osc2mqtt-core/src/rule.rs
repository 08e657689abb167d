//! Rule definitions and compilation.
//!
//! A `RuleDefinition` carries the raw declarative fields as read from
//! configuration; `ConversionRule::compile` turns one into its validated,
//! immutable form. Rules never change after compilation.

use regex::Regex;
use serde::Deserialize;

use crate::coerce::Coercion;
use crate::codec::PayloadType;
use crate::error::ConfigError;

/// Raw rule fields, as declared in configuration.
///
/// Every field has a default, so a bare `[[rules]]` table is a valid
/// catch-all rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleDefinition {
    /// Regular expression tested against the inbound topic or address.
    #[serde(rename = "match")]
    pub pattern: String,

    /// OSC address template for the MQTT -> OSC direction.
    pub address: String,

    /// MQTT topic template for the OSC -> MQTT direction.
    pub topic: String,

    /// Capture groups appended to the values in the OSC -> MQTT direction
    /// (comma-separated indices or group names).
    pub address_groups: Option<String>,

    /// Capture groups appended to the values in the MQTT -> OSC direction.
    pub topic_groups: Option<String>,

    /// Payload codec selector.
    #[serde(rename = "type")]
    pub payload_type: String,

    /// Codec-specific format descriptor.
    pub format: String,

    /// Coercions applied to values decoded from MQTT (comma-separated).
    pub from_mqtt: Option<String>,

    /// Coercions applied to values received from OSC (comma-separated).
    pub from_osc: Option<String>,

    /// OSC type tags forced onto the outgoing argument list
    /// (comma-separated).
    pub osctags: Option<String>,
}

impl Default for RuleDefinition {
    fn default() -> Self {
        Self {
            pattern: "^/?(.*)".to_string(),
            address: "/{0}".to_string(),
            topic: "{0}".to_string(),
            address_groups: None,
            topic_groups: None,
            payload_type: "struct".to_string(),
            format: "B".to_string(),
            from_mqtt: None,
            from_osc: None,
            osctags: None,
        }
    }
}

/// A reference to a capture group in a rule's match pattern.
///
/// Index 0 is the whole match, 1 the first group, following the pattern's
/// own numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    Index(usize),
    Name(String),
}

/// A compiled, immutable conversion rule.
#[derive(Debug)]
pub struct ConversionRule {
    pub name: String,
    pub pattern: Regex,
    pub address: String,
    pub topic: String,
    /// Empty when the field was not declared.
    pub address_groups: Vec<GroupRef>,
    pub topic_groups: Vec<GroupRef>,
    pub payload_type: PayloadType,
    pub format: String,
    /// `None` at a position means pass-through; empty when not declared.
    pub from_mqtt: Vec<Option<Coercion>>,
    pub from_osc: Vec<Option<Coercion>>,
    pub osctags: Vec<String>,
}

impl ConversionRule {
    /// Compile a single rule, validating its pattern and list fields.
    pub fn compile(name: &str, def: &RuleDefinition) -> Result<Self, ConfigError> {
        let pattern = Regex::new(&def.pattern).map_err(|e| ConfigError::BadPattern {
            rule: name.to_string(),
            source: Box::new(e),
        })?;

        let address_groups = parse_group_list(name, def.address_groups.as_deref())?;
        let topic_groups = parse_group_list(name, def.topic_groups.as_deref())?;

        Ok(ConversionRule {
            name: name.to_string(),
            pattern,
            address: def.address.clone(),
            topic: def.topic.clone(),
            address_groups,
            topic_groups,
            payload_type: PayloadType::parse(&def.payload_type),
            format: def.format.clone(),
            from_mqtt: parse_coercion_list(def.from_mqtt.as_deref()),
            from_osc: parse_coercion_list(def.from_osc.as_deref()),
            osctags: parse_list(def.osctags.as_deref()),
        })
    }
}

/// Split a comma-separated list field, trimming whitespace. An undeclared
/// field yields an empty list.
fn parse_list(field: Option<&str>) -> Vec<String> {
    match field {
        Some(s) if !s.trim().is_empty() => {
            s.split(',').map(|item| item.trim().to_string()).collect()
        }
        _ => Vec::new(),
    }
}

fn parse_coercion_list(field: Option<&str>) -> Vec<Option<Coercion>> {
    parse_list(field)
        .iter()
        .map(|name| Coercion::resolve(name))
        .collect()
}

fn parse_group_list(rule: &str, field: Option<&str>) -> Result<Vec<GroupRef>, ConfigError> {
    parse_list(field)
        .into_iter()
        .map(|token| {
            if token.is_empty() {
                return Err(ConfigError::BadGroupList {
                    rule: rule.to_string(),
                    list: field.unwrap_or_default().to_string(),
                });
            }
            Ok(match token.parse::<usize>() {
                Ok(index) => GroupRef::Index(index),
                Err(_) => GroupRef::Name(token),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let def = RuleDefinition::default();
        let rule = ConversionRule::compile("default", &def).unwrap();
        assert_eq!(rule.pattern.as_str(), "^/?(.*)");
        assert_eq!(rule.address, "/{0}");
        assert_eq!(rule.topic, "{0}");
        assert_eq!(rule.payload_type, PayloadType::Struct);
        assert_eq!(rule.format, "B");
        assert!(rule.from_mqtt.is_empty());
        assert!(rule.topic_groups.is_empty());
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let def = RuleDefinition {
            pattern: "(".to_string(),
            ..Default::default()
        };
        let err = ConversionRule::compile("broken", &def).unwrap_err();
        assert!(matches!(err, ConfigError::BadPattern { ref rule, .. } if rule == "broken"));
    }

    #[test]
    fn test_group_list_parsing() {
        let def = RuleDefinition {
            address_groups: Some("1, room ,2".to_string()),
            ..Default::default()
        };
        let rule = ConversionRule::compile("groups", &def).unwrap();
        assert_eq!(
            rule.address_groups,
            vec![
                GroupRef::Index(1),
                GroupRef::Name("room".to_string()),
                GroupRef::Index(2),
            ]
        );
    }

    #[test]
    fn test_empty_group_token_is_config_error() {
        let def = RuleDefinition {
            topic_groups: Some("1,,2".to_string()),
            ..Default::default()
        };
        let err = ConversionRule::compile("gaps", &def).unwrap_err();
        assert!(matches!(err, ConfigError::BadGroupList { .. }));
    }

    #[test]
    fn test_coercion_list_with_unknown_name() {
        let def = RuleDefinition {
            from_mqtt: Some("i,nope,f".to_string()),
            ..Default::default()
        };
        let rule = ConversionRule::compile("coerce", &def).unwrap();
        assert_eq!(
            rule.from_mqtt,
            vec![Some(Coercion::Int), None, Some(Coercion::Float)]
        );
    }

    #[test]
    fn test_osctags_split() {
        let def = RuleDefinition {
            osctags: Some("f, i".to_string()),
            ..Default::default()
        };
        let rule = ConversionRule::compile("tags", &def).unwrap();
        assert_eq!(rule.osctags, vec!["f".to_string(), "i".to_string()]);
    }
}
