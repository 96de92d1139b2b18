use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// Where the learner is in the curriculum and which sections they may open.
///
/// Invariants after `repair`: section 0 is always unlocked, `current_section`
/// is a valid index and every unlocked index exists in the curriculum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    current_section: usize,
    unlocked_sections: BTreeSet<usize>,
    last_updated: Option<DateTime<Utc>>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            current_section: 0,
            unlocked_sections: BTreeSet::from([0]),
            last_updated: None,
        }
    }
}

impl ProgressState {
    /// Rehydrate persisted progress. Call `repair` before trusting the values.
    #[must_use]
    pub fn from_persisted(
        current_section: usize,
        unlocked_sections: impl IntoIterator<Item = usize>,
        last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            current_section,
            unlocked_sections: unlocked_sections.into_iter().collect(),
            last_updated,
        }
    }

    #[must_use]
    pub fn current_section(&self) -> usize {
        self.current_section
    }

    #[must_use]
    pub fn unlocked_sections(&self) -> &BTreeSet<usize> {
        &self.unlocked_sections
    }

    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    #[must_use]
    pub fn is_unlocked(&self, index: usize) -> bool {
        self.unlocked_sections.contains(&index)
    }

    /// Insert an index into the unlocked set. Returns true if it was newly added.
    pub fn unlock(&mut self, index: usize) -> bool {
        self.unlocked_sections.insert(index)
    }

    /// Move the current pointer to an unlocked section.
    ///
    /// Returns false without changes when the section is locked.
    pub fn select(&mut self, index: usize) -> bool {
        if !self.is_unlocked(index) {
            return false;
        }
        self.current_section = index;
        true
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }

    /// Bring restored progress back into range for a curriculum of
    /// `section_count` sections. Returns true if anything changed.
    ///
    /// A current section that ends up locked falls back to the nearest
    /// unlocked section before it.
    pub fn repair(&mut self, section_count: usize) -> bool {
        let before = self.clone();
        let section_count = section_count.max(1);

        if self.current_section >= section_count {
            self.current_section = section_count - 1;
        }
        self.unlocked_sections.retain(|&index| index < section_count);
        self.unlocked_sections.insert(0);
        if !self.is_unlocked(self.current_section) {
            self.current_section = self
                .unlocked_sections
                .range(..self.current_section)
                .next_back()
                .copied()
                .unwrap_or(0);
        }

        *self != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_unlocks_only_first_section() {
        let state = ProgressState::default();
        assert_eq!(state.current_section(), 0);
        assert_eq!(state.unlocked_sections(), &BTreeSet::from([0]));
    }

    #[test]
    fn repair_clamps_stale_save_to_smaller_curriculum() {
        let mut state = ProgressState::from_persisted(7, [1, 3, 7], None);
        assert!(state.repair(3));
        assert_eq!(state.current_section(), 1);
        assert_eq!(state.unlocked_sections(), &BTreeSet::from([0, 1]));
    }

    #[test]
    fn repair_restores_first_section_when_set_empties() {
        let mut state = ProgressState::from_persisted(0, [9, 10], None);
        state.repair(2);
        assert_eq!(state.unlocked_sections(), &BTreeSet::from([0]));
    }

    #[test]
    fn repair_is_noop_for_valid_state() {
        let mut state = ProgressState::from_persisted(1, [0, 1], None);
        assert!(!state.repair(4));
    }

    #[test]
    fn select_refuses_locked_section() {
        let mut state = ProgressState::default();
        assert!(!state.select(1));
        assert_eq!(state.current_section(), 0);
        state.unlock(1);
        assert!(state.select(1));
        assert_eq!(state.current_section(), 1);
    }
}
