//! Ordered first-match-wins rule matching with a memoized lookup cache.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::ConfigError;
use crate::rule::{ConversionRule, GroupRef, RuleDefinition};

/// Capture group text extracted by a rule match, owned so results can be
/// cached and shared across threads.
#[derive(Debug, Clone, Default)]
pub struct CapturedGroups {
    /// Groups by pattern index; slot 0 is the whole match. Groups that did
    /// not participate hold `None`.
    groups: Vec<Option<String>>,
    /// Named groups; unparticipating names hold `None`.
    named: HashMap<String, Option<String>>,
}

impl CapturedGroups {
    fn from_captures(pattern: &regex::Regex, caps: &regex::Captures<'_>) -> Self {
        let groups = (0..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
            .collect();
        let named = pattern
            .capture_names()
            .enumerate()
            .filter_map(|(i, name)| {
                name.map(|n| (n.to_string(), caps.get(i).map(|m| m.as_str().to_string())))
            })
            .collect();
        CapturedGroups { groups, named }
    }

    /// Text of the i-th positional placeholder: `{0}` is the first capture
    /// group (pattern group 1). Unmatched or absent groups are empty.
    pub fn positional(&self, index: usize) -> &str {
        self.group(index + 1)
    }

    /// Text of a group by pattern numbering (0 = whole match); empty when
    /// absent or unparticipating.
    pub fn group(&self, index: usize) -> &str {
        self.groups
            .get(index)
            .and_then(|g| g.as_deref())
            .unwrap_or("")
    }

    /// Text of a named group; empty when absent or unparticipating.
    pub fn named(&self, name: &str) -> &str {
        self.named
            .get(name)
            .and_then(|g| g.as_deref())
            .unwrap_or("")
    }

    /// Resolve a group reference from a rule's group list.
    pub fn group_ref(&self, gref: &GroupRef) -> &str {
        match gref {
            GroupRef::Index(i) => self.group(*i),
            GroupRef::Name(n) => self.named(n),
        }
    }
}

/// An ordered, compiled rule set with a per-instance match cache.
///
/// The cache is keyed by the literal identifier string and memoizes the
/// no-match outcome too. It only short-circuits the linear scan; removing
/// it changes latency, never results. Rules are immutable for the life of
/// the set, so entries never need invalidation.
pub struct RuleSet {
    rules: Vec<Arc<ConversionRule>>,
    cache: DashMap<String, Option<(usize, CapturedGroups)>>,
}

impl RuleSet {
    /// Compile an ordered rule-name -> definition mapping.
    ///
    /// Aborts on the first malformed rule; a partial rule set is never
    /// produced.
    pub fn compile(definitions: &IndexMap<String, RuleDefinition>) -> Result<Self, ConfigError> {
        let rules = definitions
            .iter()
            .map(|(name, def)| ConversionRule::compile(name, def).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleSet {
            rules,
            cache: DashMap::new(),
        })
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Match a topic or address against the rules in declaration order and
    /// return the first hit with its captures.
    pub fn match_rule(&self, identifier: &str) -> Option<(Arc<ConversionRule>, CapturedGroups)> {
        if let Some(cached) = self.cache.get(identifier) {
            return cached
                .as_ref()
                .map(|(index, caps)| (Arc::clone(&self.rules[*index]), caps.clone()));
        }

        let found = self.rules.iter().enumerate().find_map(|(index, rule)| {
            rule.pattern.captures(identifier).map(|caps| {
                debug!(rule = %rule.name, identifier, "rule matched");
                (index, CapturedGroups::from_captures(&rule.pattern, &caps))
            })
        });
        self.cache.insert(identifier.to_string(), found.clone());
        found.map(|(index, caps)| (Arc::clone(&self.rules[index]), caps))
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rules.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_set(rules: &[(&str, &str)]) -> RuleSet {
        let defs: IndexMap<String, RuleDefinition> = rules
            .iter()
            .map(|(name, pattern)| {
                (
                    name.to_string(),
                    RuleDefinition {
                        pattern: pattern.to_string(),
                        ..Default::default()
                    },
                )
            })
            .collect();
        RuleSet::compile(&defs).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        // Both patterns match; the earlier declaration is used even though
        // the later one is more specific.
        let set = rule_set(&[("broad", "^/?(.*)"), ("narrow", "^/a/b$")]);
        let (rule, _) = set.match_rule("/a/b").unwrap();
        assert_eq!(rule.name, "broad");
    }

    #[test]
    fn test_no_match() {
        let set = rule_set(&[("lights", r"^light/\d+$")]);
        assert!(set.match_rule("sensor/3").is_none());
    }

    #[test]
    fn test_search_is_unanchored() {
        let set = rule_set(&[("sub", "light")]);
        assert!(set.match_rule("room/light/1").is_some());
    }

    #[test]
    fn test_captures_positional_and_named() {
        let set = rule_set(&[("caps", r"^(?P<room>\w+)/light/(\d+)$")]);
        let (_, caps) = set.match_rule("kitchen/light/2").unwrap();
        assert_eq!(caps.positional(0), "kitchen");
        assert_eq!(caps.positional(1), "2");
        assert_eq!(caps.named("room"), "kitchen");
        assert_eq!(caps.group(0), "kitchen/light/2");
    }

    #[test]
    fn test_unmatched_group_is_empty() {
        let set = rule_set(&[("opt", r"^a(b)?(?P<tail>c)?$")]);
        let (_, caps) = set.match_rule("a").unwrap();
        assert_eq!(caps.positional(0), "");
        assert_eq!(caps.named("tail"), "");
        assert_eq!(caps.named("no_such_group"), "");
    }

    #[test]
    fn test_repeated_lookup_is_cached() {
        let set = rule_set(&[("any", "^/?(.*)")]);
        let (first, caps1) = set.match_rule("x/y").unwrap();
        let (second, caps2) = set.match_rule("x/y").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(caps1.positional(0), caps2.positional(0));
        // No-match outcomes are memoized too.
        let misses = rule_set(&[("none", "^never$")]);
        assert!(misses.match_rule("zzz").is_none());
        assert!(misses.match_rule("zzz").is_none());
        assert_eq!(misses.cache.len(), 1);
    }

    #[test]
    fn test_independent_sets_do_not_share_cache() {
        let a = rule_set(&[("any", "^/?(.*)")]);
        let b = rule_set(&[("any", "^/?(.*)")]);
        a.match_rule("foo");
        assert_eq!(a.cache.len(), 1);
        assert_eq!(b.cache.len(), 0);
    }
}
