//! Conversion rule engine for bridging MQTT and OSC.
//!
//! Translates message identifiers (topic <-> address) and payloads
//! (opaque bytes <-> typed value sequences) according to declarative,
//! bidirectional rules:
//!
//! - [`RuleSet`] compiles an ordered rule mapping and matches identifiers
//!   first-match-wins, memoizing repeated lookups.
//! - [`codec`] decodes/encodes payloads per a rule's `type`/`format`
//!   (binary struct layouts, fixed-width arrays, JSON, text, raw bytes).
//! - [`coerce`] applies positional scalar conversions.
//! - [`template`] renders output identifiers from capture groups and the
//!   value sequence.
//! - [`Converter`] ties these together into the two translation
//!   directions.
//!
//! The engine performs no I/O and never blocks; transports live in the
//! `osc2mqtt-bridge` crate.
//!
//! # Example
//!
//! ```
//! use indexmap::IndexMap;
//! use osc2mqtt_core::{Converter, RuleDefinition, Value};
//!
//! let mut rules = IndexMap::new();
//! rules.insert(
//!     "lights".to_string(),
//!     RuleDefinition {
//!         pattern: r"^/?light/(\d+)$".to_string(),
//!         address: "/light/{0}".to_string(),
//!         ..Default::default()
//!     },
//! );
//! let converter = Converter::compile(&rules).unwrap();
//!
//! let out = converter.from_mqtt("light/7", &[1]).unwrap().unwrap();
//! assert_eq!(out.address, "/light/7");
//! assert_eq!(out.values, vec![Value::Int(1)]);
//! ```

pub mod codec;
pub mod coerce;
pub mod convert;
pub mod error;
pub mod matcher;
pub mod rule;
pub mod template;
pub mod value;

pub use codec::PayloadType;
pub use coerce::Coercion;
pub use convert::{Converter, MqttOutput, OscOutput};
pub use error::{ConfigError, ConvertError, DecodeError, EncodeError};
pub use matcher::{CapturedGroups, RuleSet};
pub use rule::{ConversionRule, GroupRef, RuleDefinition};
pub use value::Value;
