//! # Coverage data model.
//!
//! A [`CoverageSnapshot`] records, per stylesheet source and per rule selector,
//! how much of the rule was exercised while a state was captured. A
//! [`CoverageReport`] holds one merged snapshot per browser.
//!
//! ## Merge rules
//! Levels are ordered `None < Partial < Full`; merging keeps the higher level
//! for every (source, rule). The merge is therefore commutative, associative
//! and idempotent: arrival order and duplicate deliveries never change the result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::browser::BrowserId;

/// How much of a rule was exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageLevel {
    /// Rule never matched.
    #[default]
    None,
    /// Rule matched some of its selectors.
    Partial,
    /// Rule matched completely.
    Full,
}

/// Coverage collected for one result record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageSnapshot {
    sources: BTreeMap<String, BTreeMap<String, CoverageLevel>>,
}

impl CoverageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule observation, keeping the higher level if already present.
    #[must_use]
    pub fn with_rule(
        mut self,
        source: impl Into<String>,
        rule: impl Into<String>,
        level: CoverageLevel,
    ) -> Self {
        self.record(source, rule, level);
        self
    }

    /// Records a rule observation, keeping the higher level if already present.
    pub fn record(&mut self, source: impl Into<String>, rule: impl Into<String>, level: CoverageLevel) {
        let slot = self
            .sources
            .entry(source.into())
            .or_default()
            .entry(rule.into())
            .or_default();
        *slot = (*slot).max(level);
    }

    /// Level recorded for `rule` of `source`, if any.
    pub fn level(&self, source: &str, rule: &str) -> Option<CoverageLevel> {
        self.sources.get(source)?.get(rule).copied()
    }

    /// Merges `other` into `self` (level max per rule).
    pub fn merge(&mut self, other: &CoverageSnapshot) {
        for (source, rules) in &other.sources {
            let mine = self.sources.entry(source.clone()).or_default();
            for (rule, level) in rules {
                let slot = mine.entry(rule.clone()).or_default();
                *slot = (*slot).max(*level);
            }
        }
    }

    /// Number of (source, rule) pairs.
    pub fn rule_count(&self) -> usize {
        self.sources.values().map(BTreeMap::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.values().all(BTreeMap::is_empty)
    }

    /// Iterates over `(source, rule, level)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, CoverageLevel)> {
        self.sources.iter().flat_map(|(source, rules)| {
            rules
                .iter()
                .map(move |(rule, level)| (source.as_str(), rule.as_str(), *level))
        })
    }
}

/// Coverage accumulated over a run, one snapshot per browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageReport {
    browsers: BTreeMap<BrowserId, CoverageSnapshot>,
}

impl CoverageReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot slot of `browser_id`, if any record contributed to it.
    pub fn get(&self, browser_id: &BrowserId) -> Option<&CoverageSnapshot> {
        self.browsers.get(browser_id)
    }

    /// Mutable slot of `browser_id`, created empty on first use.
    pub fn slot_mut(&mut self, browser_id: &BrowserId) -> &mut CoverageSnapshot {
        self.browsers.entry(browser_id.clone()).or_default()
    }

    /// Number of browser slots.
    pub fn len(&self) -> usize {
        self.browsers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.browsers.is_empty()
    }

    /// Iterates over browser slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&BrowserId, &CoverageSnapshot)> {
        self.browsers.iter()
    }

    /// Renders the report as pretty JSON for coverage consumers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_highest_level() {
        let mut snap = CoverageSnapshot::new();
        snap.record("main.css", ".btn", CoverageLevel::Full);
        snap.record("main.css", ".btn", CoverageLevel::Partial);
        assert_eq!(snap.level("main.css", ".btn"), Some(CoverageLevel::Full));
        assert_eq!(snap.level("main.css", ".nav"), None);
        assert_eq!(snap.rule_count(), 1);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = CoverageSnapshot::new()
            .with_rule("main.css", ".btn", CoverageLevel::Partial)
            .with_rule("main.css", ".nav", CoverageLevel::None);
        let b = CoverageSnapshot::new()
            .with_rule("main.css", ".btn", CoverageLevel::Full)
            .with_rule("print.css", "body", CoverageLevel::Full);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab, ba);
        assert_eq!(ab.level("main.css", ".btn"), Some(CoverageLevel::Full));
        assert_eq!(ab.rule_count(), 3);

        // Idempotent: merging the same snapshot again changes nothing.
        let mut again = ab.clone();
        again.merge(&b);
        assert_eq!(again, ab);
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = CoverageReport::new();
        report
            .slot_mut(&BrowserId::from("chrome"))
            .record("main.css", ".btn", CoverageLevel::Partial);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["chrome"]["main.css"][".btn"], "partial");
    }
}
