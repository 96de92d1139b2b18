use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Latest pronunciation accuracy per phrase, keyed by section then phrase.
///
/// A worse retry replaces a better earlier score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PronunciationScoreTable {
    sections: BTreeMap<usize, BTreeMap<usize, u8>>,
}

impl PronunciationScoreTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a score, clamped to 100.
    pub fn record(&mut self, section: usize, phrase: usize, score: u8) {
        self.sections
            .entry(section)
            .or_default()
            .insert(phrase, score.min(100));
    }

    #[must_use]
    pub fn get(&self, section: usize, phrase: usize) -> Option<u8> {
        self.sections.get(&section)?.get(&phrase).copied()
    }

    #[must_use]
    pub fn section(&self, section: usize) -> Option<&BTreeMap<usize, u8>> {
        self.sections.get(&section)
    }

    /// True when every phrase `0..phrase_count` has a score of at least `threshold`.
    ///
    /// A section with no phrases is trivially met.
    #[must_use]
    pub fn all_at_least(&self, section: usize, phrase_count: usize, threshold: u8) -> bool {
        (0..phrase_count).all(|phrase| self.get(section, phrase).is_some_and(|s| s >= threshold))
    }

    /// Number of phrases in `0..phrase_count` that meet `threshold`.
    #[must_use]
    pub fn count_at_least(&self, section: usize, phrase_count: usize, threshold: u8) -> usize {
        (0..phrase_count)
            .filter(|&phrase| self.get(section, phrase).is_some_and(|s| s >= threshold))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.values().all(BTreeMap::is_empty)
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_requires_every_phrase() {
        let mut table = PronunciationScoreTable::new();
        table.record(0, 0, 95);
        assert!(!table.all_at_least(0, 2, 89));
        table.record(0, 1, 88);
        assert!(!table.all_at_least(0, 2, 89));
        assert_eq!(table.count_at_least(0, 2, 89), 1);
        table.record(0, 1, 89);
        assert!(table.all_at_least(0, 2, 89));
    }

    #[test]
    fn serializes_as_nested_maps() {
        let mut table = PronunciationScoreTable::new();
        table.record(1, 2, 77);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"1":{"2":77}}"#);
        let back: PronunciationScoreTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(1, 2), Some(77));
    }

    #[test]
    fn latest_attempt_replaces_previous() {
        let mut table = PronunciationScoreTable::new();
        table.record(0, 0, 100);
        table.record(0, 0, 40);
        assert_eq!(table.get(0, 0), Some(40));
        table.clear();
        assert!(table.is_empty());
    }
}
